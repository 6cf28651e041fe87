// ============================================================
// Layer 3 — Question/Answer Domain Types
// ============================================================
// QaPair is the human-facing unit stored in seed examples.
// QaRecord is one line of the QA generation artifact: a
// generated question/answer tied to the chunk it came from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer:   String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer:   answer.into(),
        }
    }
}

/// One generated (chunk, question, answer) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub chunk_id: String,

    /// Original chunk text the question was generated from
    pub context: String,

    pub question: String,
    pub answer:   String,
}

impl QaRecord {
    pub fn pair(&self) -> QaPair {
        QaPair::new(&self.question, &self.answer)
    }
}

/// All QA pairs generated for one chunk, in artifact order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkQa {
    pub chunk_id: String,
    pub context:  String,
    pub pairs:    Vec<QaPair>,
}

/// Merge artifact rows by chunk id. Chunks keep their first-seen
/// order; the context of a chunk is taken from its first row.
pub fn merge_by_chunk(records: &[QaRecord]) -> Vec<ChunkQa> {
    let mut merged: Vec<ChunkQa>         = Vec::new();
    let mut index:  HashMap<&str, usize> = HashMap::new();

    for record in records {
        match index.get(record.chunk_id.as_str()) {
            Some(&i) => merged[i].pairs.push(record.pair()),
            None => {
                index.insert(record.chunk_id.as_str(), merged.len());
                merged.push(ChunkQa {
                    chunk_id: record.chunk_id.clone(),
                    context:  record.context.clone(),
                    pairs:    vec![record.pair()],
                });
            }
        }
    }

    merged
}
