// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Opens the tokenizer used for every sizing decision.
//
//   "words"               → HeuristicTokenCounter (words × 1.3)
//   path to tokenizer.json → HfTokenCounter::from_file
//   anything else          → HfTokenCounter::from_pretrained (hub id)

use anyhow::{Context, Result};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::data::splitter::num_tokens_from_words;
use crate::domain::traits::TokenCounter;

/// Hub tokenizer the pipeline was tuned against.
pub const DEFAULT_TOKENIZER: &str = "instructlab/granite-7b-lab";

/// Tokenizer name selecting the offline word-count estimate.
pub const HEURISTIC_TOKENIZER: &str = "words";

/// Counts tokens with a HuggingFace tokenizer.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        Ok(Self { tokenizer })
    }

    pub fn from_pretrained(identifier: &str) -> Result<Self> {
        let tokenizer = Tokenizer::from_pretrained(identifier, None)
            .map_err(|e| anyhow::anyhow!("Cannot fetch tokenizer '{}': {}", identifier, e))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(encoding.get_ids().len())
    }
}

/// Offline estimate: one word is about 1.3 tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(num_tokens_from_words(text.split_whitespace().count()))
    }
}

/// Open the token counter named by `name`.
pub fn open_token_counter(name: &str) -> Result<Box<dyn TokenCounter>> {
    if name == HEURISTIC_TOKENIZER {
        tracing::info!("Using word-count token estimate");
        return Ok(Box::new(HeuristicTokenCounter));
    }

    let path = Path::new(name);
    let counter = if path.is_file() {
        tracing::info!("Loading tokenizer from '{}'", path.display());
        HfTokenCounter::from_file(path)
    } else {
        tracing::info!("Fetching tokenizer '{}'", name);
        HfTokenCounter::from_pretrained(name)
    }
    .with_context(|| format!("Cannot open tokenizer '{name}'"))?;

    Ok(Box::new(counter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_scales_word_count() {
        let counter = HeuristicTokenCounter;
        assert_eq!(counter.count_tokens("").unwrap(), 0);
        assert_eq!(counter.count_tokens("one two three four five six seven eight nine ten").unwrap(), 13);
    }

    #[test]
    fn test_open_heuristic_counter() {
        let counter = open_token_counter(HEURISTIC_TOKENIZER).unwrap();
        assert_eq!(counter.count_tokens("a b").unwrap(), 2);
    }

    #[test]
    fn test_tokenizer_file_is_loaded() {
        // Minimal word-level tokenizer.json
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"[UNK]": 0, "hello": 1, "world": 2},
                "unk_token": "[UNK]"
            }
        });
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let counter = open_token_counter(path.to_str().unwrap()).unwrap();
        assert_eq!(counter.count_tokens("hello world again").unwrap(), 3);
    }
}
