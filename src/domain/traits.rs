// ============================================================
// Layer 3 — Core Traits (Injected Capabilities)
// ============================================================
// The pipeline consumes three external capabilities. Each is a
// trait so callers choose the implementation explicitly:
//
//   TokenCounter — measures text length in tokens
//                  (infra::tokenizer_store::HfTokenCounter,
//                   infra::tokenizer_store::HeuristicTokenCounter)
//   ChunkBreak   — custom "start a new chunk here" predicate
//   QaGenerator  — external question/answer generation service
//                  (infra::qa_service::OpenAiLikeGenerator)

use anyhow::Result;
use std::fmt;
use std::path::Path;

use crate::domain::chunk::Chunk;

// ─── TokenCounter ─────────────────────────────────────────────────────────────
pub trait TokenCounter {
    /// Number of tokens `text` encodes to, without special tokens.
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

// ─── ChunkBreak ───────────────────────────────────────────────────────────────
/// Strategy deciding whether an element's text opens a new chunk.
pub trait ChunkBreak {
    fn should_break(&self, text: &str) -> bool;
}

/// Break before any element whose text starts with one of the prefixes.
#[derive(Debug, Clone, Default)]
pub struct PrefixBreak {
    prefixes: Vec<String>,
}

impl PrefixBreak {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl ChunkBreak for PrefixBreak {
    fn should_break(&self, text: &str) -> bool {
        let text = text.trim_start();
        self.prefixes.iter().any(|p| text.starts_with(p.as_str()))
    }
}

// ─── QaGenerator ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Every chunk produced a parsable reply
    Success,

    /// Some replies could not be parsed and yielded no QA pairs
    Partial { unparsed_chunks: usize },
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStatus::Success => write!(f, "success"),
            GenerationStatus::Partial { unparsed_chunks } => {
                write!(f, "partial ({unparsed_chunks} chunk(s) without QA pairs)")
            }
        }
    }
}

pub trait QaGenerator {
    /// Generate QA pairs for `chunks`, appending one QaRecord JSON line
    /// per pair to `output`. A failed service call is returned as an
    /// error; nothing written before the failure is salvaged.
    fn generate(&self, chunks: &[Chunk], output: &Path) -> Result<GenerationStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_break_matches_trimmed_start() {
        let rule = PrefixBreak::new(["Chapter", "Part"]);
        assert!(rule.should_break("  Chapter 3"));
        assert!(rule.should_break("Part II"));
        assert!(!rule.should_break("In this chapter"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(GenerationStatus::Success.to_string(), "success");
        assert_eq!(
            GenerationStatus::Partial { unparsed_chunks: 2 }.to_string(),
            "partial (2 chunk(s) without QA pairs)"
        );
    }
}
