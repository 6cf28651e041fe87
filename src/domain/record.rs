// ============================================================
// Layer 3 — Generated Rows and Training Records
// ============================================================
// GeneratedRecord is one row produced by synthetic-data
// generation: a document, a question about it, and a response.
// Some rows were generated from an augmented rewrite of the
// original document; those carry the raw document and the kind
// of rewrite. That optional pair is modelled as DocumentOrigin
// instead of two independently optional fields.
//
// KnowledgeRecord is the terminal training record: a role-tagged
// message list, JSON-encoded metadata, a unique id, and the
// optional `unmask` pretraining marker.

use serde::{Deserialize, Serialize};

// ─── Dataset type ─────────────────────────────────────────────────────────────
/// Which rewrite of the source document a generated row was built on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatasetType {
    BaseDocument,
    SummaryDetailed,
    SummaryExtractive,
    SummaryAtomicFacts,
    Other(String),
}

impl DatasetType {
    pub fn as_str(&self) -> &str {
        match self {
            DatasetType::BaseDocument       => "base_document",
            DatasetType::SummaryDetailed    => "summary_detailed",
            DatasetType::SummaryExtractive  => "summary_extractive",
            DatasetType::SummaryAtomicFacts => "summary_atomic_facts",
            DatasetType::Other(s)           => s,
        }
    }
}

impl From<String> for DatasetType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "base_document"        => DatasetType::BaseDocument,
            "summary_detailed"     => DatasetType::SummaryDetailed,
            "summary_extractive"   => DatasetType::SummaryExtractive,
            "summary_atomic_facts" => DatasetType::SummaryAtomicFacts,
            _                      => DatasetType::Other(s),
        }
    }
}

impl From<DatasetType> for String {
    fn from(t: DatasetType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Generated rows ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOrigin {
    /// Row carries no rewrite provenance
    Plain,

    /// Row was generated from a rewrite of `raw_document`
    Augmented {
        raw_document: String,
        dataset_type: DatasetType,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct RawGeneratedRecord {
    document: String,
    question: String,
    response: String,
    domain:   String,

    #[serde(default)]
    document_outline: Option<String>,
    #[serde(default)]
    raw_document: Option<String>,
    #[serde(default)]
    dataset_type: Option<DatasetType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawGeneratedRecord")]
pub struct GeneratedRecord {
    pub document:         String,
    pub question:         String,
    pub response:         String,
    pub domain:           String,
    pub document_outline: Option<String>,
    pub origin:           DocumentOrigin,
}

impl From<RawGeneratedRecord> for GeneratedRecord {
    fn from(raw: RawGeneratedRecord) -> Self {
        let origin = match (raw.raw_document, raw.dataset_type) {
            (Some(raw_document), Some(dataset_type)) => DocumentOrigin::Augmented {
                raw_document,
                dataset_type,
            },
            _ => DocumentOrigin::Plain,
        };
        Self {
            document: raw.document,
            question: raw.question,
            response: raw.response,
            domain: raw.domain,
            document_outline: raw.document_outline,
            origin,
        }
    }
}

#[cfg(test)]
impl GeneratedRecord {
    pub fn new(
        document: impl Into<String>,
        question: impl Into<String>,
        response: impl Into<String>,
        domain:   impl Into<String>,
    ) -> Self {
        Self {
            document:         document.into(),
            question:         question.into(),
            response:         response.into(),
            domain:           domain.into(),
            document_outline: None,
            origin:           DocumentOrigin::Plain,
        }
    }

    pub fn with_origin(mut self, raw_document: impl Into<String>, dataset_type: DatasetType) -> Self {
        self.origin = DocumentOrigin::Augmented {
            raw_document: raw_document.into(),
            dataset_type,
        };
        self
    }

    pub fn with_outline(mut self, outline: impl Into<String>) -> Self {
        self.document_outline = Some(outline.into());
        self
    }
}

// ─── Training records ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role:    Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Metadata attached to every training record, stored JSON-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sdg_document: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dataset_type: Option<DatasetType>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_document: Option<String>,

    pub dataset: String,
    pub domain:  String,
}

impl RecordMetadata {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(encoded: &str) -> serde_json::Result<Self> {
        serde_json::from_str(encoded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub messages: Vec<Message>,

    /// JSON-encoded RecordMetadata
    pub metadata: String,

    pub id: String,

    /// Golden document kept apart from the messages until RAFT
    /// sampling inlines it
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unmask: Option<bool>,
}

impl KnowledgeRecord {
    pub fn new(messages: Vec<Message>, metadata: &RecordMetadata) -> serde_json::Result<Self> {
        Ok(Self {
            messages,
            metadata: metadata.encode()?,
            id:       uuid::Uuid::new_v4().to_string(),
            context:  None,
            unmask:   None,
        })
    }

    /// Index of the first user turn, wherever it sits in the sequence.
    pub fn first_user_index(&self) -> Option<usize> {
        self.messages.iter().position(|m| m.role == Role::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_requires_both_fields() {
        let plain: GeneratedRecord = serde_json::from_str(
            r#"{"document": "d", "question": "q", "response": "r", "domain": "x", "raw_document": "raw"}"#,
        )
        .unwrap();
        assert_eq!(plain.origin, DocumentOrigin::Plain);

        let augmented: GeneratedRecord = serde_json::from_str(
            r#"{"document": "d", "question": "q", "response": "r", "domain": "x",
                "raw_document": "raw", "dataset_type": "summary_extractive"}"#,
        )
        .unwrap();
        assert_eq!(
            augmented.origin,
            DocumentOrigin::Augmented {
                raw_document: "raw".to_string(),
                dataset_type: DatasetType::SummaryExtractive,
            }
        );
    }

    #[test]
    fn test_unknown_dataset_type_round_trips_its_name() {
        let t: DatasetType = serde_json::from_str("\"key_points\"").unwrap();
        assert_eq!(t, DatasetType::Other("key_points".to_string()));
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"key_points\"");
    }

    #[test]
    fn test_metadata_skips_absent_fields() {
        let meta = RecordMetadata {
            dataset: "document_knowledge_qa".to_string(),
            domain:  "finance".to_string(),
            ..Default::default()
        };
        let encoded = meta.encode().unwrap();
        assert!(!encoded.contains("raw_document"));
        assert_eq!(RecordMetadata::decode(&encoded).unwrap(), meta);
    }

    #[test]
    fn test_first_user_index_skips_leading_turns() {
        let record = KnowledgeRecord {
            messages: vec![Message::assistant("hello"), Message::user("question")],
            metadata: "{}".to_string(),
            id:       "1".to_string(),
            context:  None,
            unmask:   None,
        };
        assert_eq!(record.first_user_index(), Some(1));
    }
}
