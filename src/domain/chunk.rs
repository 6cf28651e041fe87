// ============================================================
// Layer 3 — Chunk Domain Types
// ============================================================
// A Chunk is one token-bounded span of document text. Chunks
// are identified by their source file and their position in
// that file's chunk sequence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document name (file stem or file name)
    pub source: String,

    /// Position in the source document's chunk sequence
    pub index: usize,

    pub text: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            index,
            text: text.into(),
        }
    }

    /// Build the ordered chunk list of one source document.
    pub fn sequence(source: &str, texts: Vec<String>) -> Vec<Chunk> {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk::new(source, index, text))
            .collect()
    }

    /// Stable identifier used to key generated QA pairs.
    pub fn id(&self) -> String {
        format!("{}#{}", self.source, self.index)
    }
}

/// One line of `chunks.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub file:  String,
    pub chunk: String,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// All chunk-store entries of one source file, in file order.
#[derive(Debug, Clone)]
pub struct FileChunks {
    pub file:    String,
    pub entries: Vec<ChunkEntry>,
}

impl FileChunks {
    pub fn chunks(&self) -> Vec<Chunk> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, e)| Chunk::new(&self.file, index, e.chunk.clone()))
            .collect()
    }
}

/// Group chunk-store entries by source file, keeping files in the
/// order they first appear and entries in line order.
pub fn group_by_file(entries: Vec<ChunkEntry>) -> Vec<FileChunks> {
    let mut groups: Vec<FileChunks>        = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        match position.get(&entry.file) {
            Some(&i) => groups[i].entries.push(entry),
            None => {
                position.insert(entry.file.clone(), groups.len());
                groups.push(FileChunks {
                    file:    entry.file.clone(),
                    entries: vec![entry],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str, chunk: &str) -> ChunkEntry {
        ChunkEntry {
            file:     file.to_string(),
            chunk:    chunk.to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_group_by_file_keeps_first_seen_order() {
        let groups = group_by_file(vec![
            entry("b.pdf", "b1"),
            entry("a.pdf", "a1"),
            entry("b.pdf", "b2"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].file, "b.pdf");
        let texts: Vec<_> = groups[0].chunks().into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["b1", "b2"]);
        assert_eq!(groups[1].chunks()[0].id(), "a.pdf#0");
    }

    #[test]
    fn test_chunk_entry_metadata_defaults() {
        let e: ChunkEntry = serde_json::from_str(r#"{"file": "f", "chunk": "c"}"#).unwrap();
        assert!(e.metadata.is_null());
    }
}
