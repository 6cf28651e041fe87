// ============================================================
// Layer 4 — Markdown Splitter
// ============================================================
// Splits long markdown text into character-bounded pieces with
// `text_splitter::MarkdownSplitter`, which prefers the coarsest
// structural boundary that fits (heading, code block, rule,
// paragraph, line, word, character). Neighbouring pieces share up
// to `DEFAULT_CHUNK_OVERLAP` characters.
//
// Sizing heuristics (kept for compatibility with existing runs):
//   1 word  ≈ 1.3 tokens
//   1 token ≈ 4 characters

use anyhow::Result;
use text_splitter::{ChunkConfig, MarkdownSplitter};

use crate::data::preprocessor::Preprocessor;
use crate::domain::error::PipelineError;

/// Characters shared between neighbouring chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Tokens reserved for the prompt around a chunk.
const CONTEXT_RESERVE_TOKENS: usize = 1024;

pub fn num_tokens_from_words(num_words: usize) -> usize {
    (num_words as f64 * 1.3) as usize
}

pub fn num_chars_from_tokens(num_tokens: usize) -> usize {
    num_tokens * 4
}

pub struct MarkdownChunker {
    splitter: MarkdownSplitter<text_splitter::Characters>,
}

impl MarkdownChunker {
    /// Fails when `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size).with_overlap(chunk_overlap)?;
        Ok(Self { splitter: MarkdownSplitter::new(config) })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Split whole documents into chunks of roughly `chunk_word_count`
/// words, refusing budgets that cannot fit the server context.
pub fn chunk_document(
    documents:        &[String],
    server_ctx_size:  usize,
    chunk_word_count: usize,
) -> Result<Vec<String>> {
    let tokens_per_doc = num_tokens_from_words(chunk_word_count);
    if tokens_per_doc > server_ctx_size.saturating_sub(CONTEXT_RESERVE_TOKENS) {
        return Err(PipelineError::ContextWindowExceeded {
            word_count: chunk_word_count,
            server_ctx_size,
        }
        .into());
    }

    let splitter     = MarkdownChunker::new(num_chars_from_tokens(tokens_per_doc), DEFAULT_CHUNK_OVERLAP)?;
    let preprocessor = Preprocessor::new()?;

    let mut content = Vec::new();
    for doc in documents {
        content.extend(splitter.split(&preprocessor.tidy_tables(doc)));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_conversions() {
        assert_eq!(num_tokens_from_words(1000), 1300);
        assert_eq!(num_chars_from_tokens(1300), 5200);
        assert_eq!(num_tokens_from_words(2), 2);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let s = MarkdownChunker::new(100, 10).unwrap();
        assert_eq!(s.split("just a few words"), vec!["just a few words"]);
    }

    #[test]
    fn test_splits_on_headings_first() {
        let s      = MarkdownChunker::new(30, 0).unwrap();
        let chunks = s.split("# One\nalpha beta gamma\n\n## Two\ndelta epsilon");
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# One"));
        assert!(chunks[1].starts_with("## Two"));
    }

    #[test]
    fn test_chunks_respect_size() {
        let s      = MarkdownChunker::new(20, 5).unwrap();
        let chunks = s.split("one two three four five six seven eight nine ten eleven twelve");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        assert!(MarkdownChunker::new(10, 20).is_err());
    }

    #[test]
    fn test_chunk_document_rejects_oversized_budget() {
        let err = chunk_document(&["text".to_string()], 2048, 1024).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ContextWindowExceeded { .. })
        ));
    }

    #[test]
    fn test_chunk_document_splits_each_document() {
        let docs = vec!["short doc".to_string(), "another short doc".to_string()];
        let chunks = chunk_document(&docs, 4096, 1024).unwrap();
        assert_eq!(chunks, vec!["short doc", "another short doc"]);
    }
}
