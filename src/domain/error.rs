// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Two kinds of failure abort a run:
//   - configuration / validation problems (paths, schemas, budgets)
//   - content-size violations (a chunk over the hard token ceiling)
//
// Degenerate corpora (one unique document, too few distractors)
// are not errors; they are logged and the pipeline continues.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("path {path} must be a directory")]
    MissingPath { path: PathBuf },

    #[error("{dir} does not contain a {file}")]
    MissingFile { dir: PathBuf, file: &'static str },

    #[error("seed examples file is invalid: {reason}")]
    InvalidSeedFile { reason: String },

    #[error("seed example {index} is invalid: {reason}")]
    InvalidSeedExample { index: usize, reason: String },

    #[error(
        "given word count ({word_count}) per doc will exceed the server context window size ({server_ctx_size})"
    )]
    ContextWindowExceeded {
        word_count:      usize,
        server_ctx_size: usize,
    },

    #[error("chunk \"{preview}\" exceeds token count of {limit}")]
    ChunkTooLarge { preview: String, limit: usize },

    #[error("requested {requested} chunks but only {available} are available")]
    NotEnoughChunks { requested: usize, available: usize },

    #[error("seed example index {index} is out of range ({available} seed examples)")]
    SeedExampleOutOfRange { index: usize, available: usize },

    #[error("record {id} has no separate context to build a RAFT block from")]
    MissingContext { id: String },

    #[error("record {id} has no user message")]
    MissingUserTurn { id: String },

    #[error("table reference '{reference}' cannot be resolved")]
    UnresolvedTable { reference: String },
}

/// Shorten a chunk to its first and last three words so an error
/// message can point at the offending source text without dumping it.
pub fn preview_chunk(chunk: &str) -> String {
    let words: Vec<&str> = chunk.split_whitespace().collect();
    if words.len() > 7 {
        format!(
            "{} ... {}",
            words[..3].join(" "),
            words[words.len() - 3..].join(" ")
        )
    } else {
        chunk.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_chunks() {
        assert_eq!(preview_chunk("one two three"), "one two three");
    }

    #[test]
    fn test_preview_truncates_long_chunks() {
        let chunk = "a b c d e f g h i";
        assert_eq!(preview_chunk(chunk), "a b c ... g h i");
    }

    #[test]
    fn test_chunk_too_large_message_names_preview() {
        let err = PipelineError::ChunkTooLarge {
            preview: preview_chunk("w1 w2 w3 w4 w5 w6 w7 w8"),
            limit:   1024,
        };
        assert_eq!(
            err.to_string(),
            "chunk \"w1 w2 w3 ... w6 w7 w8\" exceeds token count of 1024"
        );
    }
}
