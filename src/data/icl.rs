// ============================================================
// Layer 4 — ICL Attacher
// ============================================================
// Cross-joins every chunk with every seed example so the QA
// generator sees one worked example (context + 3 QA pairs)
// next to each chunk:
//
//   C chunks × E seed examples → C×E IclRecords
//
// Records are grouped by seed example, in seed-file order.
//
// Oversized chunks are handled by an explicit policy:
//   Reject  — fail with ChunkTooLarge naming the chunk
//   Resplit — re-split the chunk with the markdown splitter
//             and attach each piece separately
//
// Finally, records whose document is `min_tokens` tokens or
// shorter are dropped as noise.

use anyhow::Result;
use std::collections::HashMap;

use crate::data::splitter::chunk_document;
use crate::domain::chunk::Chunk;
use crate::domain::error::{preview_chunk, PipelineError};
use crate::domain::seed::{IclRecord, SeedExample, SeedFile, QA_PAIRS_PER_EXAMPLE};
use crate::domain::traits::TokenCounter;

pub const DEFAULT_ICL_MAX_TOKENS: usize   = 1024;
pub const DEFAULT_ICL_MIN_TOKENS: usize   = 100;
pub const DEFAULT_RESPLIT_CTX_SIZE: usize = 4096;
pub const DEFAULT_RESPLIT_WORDS: usize    = 1024;

/// What to do with a chunk over `max_token_count` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OversizePolicy {
    Reject {
        max_token_count: usize,
    },
    Resplit {
        max_token_count:  usize,
        server_ctx_size:  usize,
        chunk_word_count: usize,
    },
}

impl Default for OversizePolicy {
    fn default() -> Self {
        OversizePolicy::Resplit {
            max_token_count:  DEFAULT_ICL_MAX_TOKENS,
            server_ctx_size:  DEFAULT_RESPLIT_CTX_SIZE,
            chunk_word_count: DEFAULT_RESPLIT_WORDS,
        }
    }
}

pub struct IclAttacher<'a> {
    counter:    &'a dyn TokenCounter,
    policy:     OversizePolicy,
    min_tokens: usize,
}

impl<'a> IclAttacher<'a> {
    pub fn new(counter: &'a dyn TokenCounter, policy: OversizePolicy) -> Self {
        Self {
            counter,
            policy,
            min_tokens: DEFAULT_ICL_MIN_TOKENS,
        }
    }

    pub fn min_tokens(mut self, min_tokens: usize) -> Self {
        self.min_tokens = min_tokens;
        self
    }

    /// Expand and filter: the records ready for QA generation.
    pub fn attach(&self, chunks: &[Chunk], seeds: &SeedFile) -> Result<Vec<IclRecord>> {
        let _span = tracing::info_span!("icl", chunks = chunks.len(), seeds = seeds.seed_examples.len())
            .entered();

        let candidates = self.expand(chunks, seeds)?;
        let before     = candidates.len();

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(before);
        for record in candidates {
            let tokens = match counts.get(&record.document) {
                Some(&n) => n,
                None => {
                    let n = self.counter.count_tokens(&record.document)?;
                    counts.insert(record.document.clone(), n);
                    n
                }
            };
            if tokens > self.min_tokens {
                kept.push(record);
            }
        }

        tracing::info!(
            "Attached ICLs: {} candidates, {} kept (> {} tokens)",
            before,
            kept.len(),
            self.min_tokens
        );
        Ok(kept)
    }

    /// Every (seed example, chunk piece) pair, before the length filter.
    pub fn expand(&self, chunks: &[Chunk], seeds: &SeedFile) -> Result<Vec<IclRecord>> {
        for (i, example) in seeds.seed_examples.iter().enumerate() {
            if example.questions_and_answers.len() != QA_PAIRS_PER_EXAMPLE {
                return Err(PipelineError::InvalidSeedExample {
                    index:  i + 1,
                    reason: format!(
                        "has {} question-answer pairs, expected {}",
                        example.questions_and_answers.len(),
                        QA_PAIRS_PER_EXAMPLE
                    ),
                }
                .into());
            }
        }

        let mut pieces: Vec<(&Chunk, Vec<String>)> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            pieces.push((chunk, self.apply_policy(&chunk.text)?));
        }

        let mut records = Vec::new();
        for example in &seeds.seed_examples {
            for (chunk, texts) in &pieces {
                for text in texts {
                    records.push(icl_record(text, &chunk.source, seeds, example));
                }
            }
        }
        Ok(records)
    }

    fn apply_policy(&self, text: &str) -> Result<Vec<String>> {
        match self.policy {
            OversizePolicy::Reject { max_token_count } => {
                if self.counter.count_tokens(text)? > max_token_count {
                    return Err(PipelineError::ChunkTooLarge {
                        preview: preview_chunk(text),
                        limit:   max_token_count,
                    }
                    .into());
                }
                Ok(vec![text.to_string()])
            }
            OversizePolicy::Resplit { max_token_count, server_ctx_size, chunk_word_count } => {
                if self.counter.count_tokens(text)? > max_token_count {
                    tracing::debug!("Re-splitting oversized chunk \"{}\"", preview_chunk(text));
                    chunk_document(&[text.to_string()], server_ctx_size, chunk_word_count)
                } else {
                    Ok(vec![text.to_string()])
                }
            }
        }
    }
}

fn icl_record(document: &str, title: &str, seeds: &SeedFile, example: &SeedExample) -> IclRecord {
    let qa = &example.questions_and_answers;
    IclRecord {
        document:         document.to_string(),
        document_outline: seeds.document_outline.clone(),
        document_title:   title.to_string(),
        domain:           seeds.domain.clone(),
        icl_document:     example.context.clone(),
        icl_query_1:      qa[0].question.clone(),
        icl_response_1:   qa[0].answer.clone(),
        icl_query_2:      qa[1].question.clone(),
        icl_response_2:   qa[1].answer.clone(),
        icl_query_3:      qa[2].question.clone(),
        icl_response_3:   qa[2].answer.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qa_pair::QaPair;
    use crate::infra::tokenizer_store::HeuristicTokenCounter;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    fn example(tag: &str, pairs: usize) -> SeedExample {
        SeedExample {
            context: format!("context {tag}"),
            questions_and_answers: (1..=pairs)
                .map(|i| QaPair::new(format!("{tag} q{i}"), format!("{tag} a{i}")))
                .collect(),
        }
    }

    fn seeds(examples: Vec<SeedExample>) -> SeedFile {
        SeedFile {
            seed_examples:    examples,
            document_outline: "Outline".to_string(),
            domain:           "science".to_string(),
        }
    }

    fn reject(max: usize) -> OversizePolicy {
        OversizePolicy::Reject { max_token_count: max }
    }

    #[test]
    fn test_expansion_is_chunks_times_examples() {
        let counter = HeuristicTokenCounter;
        let chunks  = Chunk::sequence("doc", vec![words(10, "a"), words(200, "b"), words(90, "c")]);
        let seeds   = seeds(vec![example("x", 3), example("y", 3)]);
        let attacher = IclAttacher::new(&counter, reject(1024));

        let all = attacher.expand(&chunks, &seeds).unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].icl_query_1, "x q1");
        assert_eq!(all[3].icl_response_3, "y a3");
        assert_eq!(all[4].document_title, "doc");
        assert_eq!(all[4].domain, "science");
    }

    #[test]
    fn test_short_documents_are_filtered() {
        let counter = HeuristicTokenCounter;
        // 10 words → 13 tokens, 200 → 260, 77 → 100 (not > 100), 78 → 101
        let chunks = Chunk::sequence(
            "doc",
            vec![words(10, "a"), words(200, "b"), words(77, "c"), words(78, "d")],
        );
        let seeds    = seeds(vec![example("x", 3), example("y", 3)]);
        let attacher = IclAttacher::new(&counter, reject(1024));

        let kept = attacher.attach(&chunks, &seeds).unwrap();
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|r| r.document.starts_with('b') || r.document.starts_with('d')));
    }

    #[test]
    fn test_reject_policy_names_the_chunk() {
        let counter  = HeuristicTokenCounter;
        let text     = format!("first second third {} last1 last2 last3", words(100, "mid"));
        let chunks   = Chunk::sequence("doc", vec![text]);
        let attacher = IclAttacher::new(&counter, reject(50));

        let err = attacher.attach(&chunks, &seeds(vec![example("x", 3)])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("first second third ... last1 last2 last3"), "{msg}");
        assert!(msg.contains("50"));
    }

    #[test]
    fn test_resplit_policy_splits_oversized_chunk() {
        let counter  = HeuristicTokenCounter;
        let long     = (0..40).map(|i| format!("{}\n\n", words(20, &format!("p{i}")))).collect::<String>();
        let chunks   = Chunk::sequence("doc", vec![long]);
        let policy   = OversizePolicy::Resplit {
            max_token_count:  500,
            server_ctx_size:  4096,
            chunk_word_count: 200,
        };
        let attacher = IclAttacher::new(&counter, policy);

        let all = attacher.expand(&chunks, &seeds(vec![example("x", 3)])).unwrap();
        assert!(all.len() > 1);
        assert!(all.iter().all(|r| r.document_title == "doc"));
    }

    #[test]
    fn test_seed_example_without_three_pairs_is_invalid() {
        let counter  = HeuristicTokenCounter;
        let chunks   = Chunk::sequence("doc", vec![words(200, "b")]);
        let attacher = IclAttacher::new(&counter, reject(1024));

        let err = attacher
            .attach(&chunks, &seeds(vec![example("x", 3), example("y", 2)]))
            .unwrap_err();
        assert!(err.to_string().contains("2"));
    }

    #[test]
    fn test_seed_example_with_extra_pairs_is_invalid() {
        let counter  = HeuristicTokenCounter;
        let chunks   = Chunk::sequence("doc", vec![words(200, "b")]);
        let attacher = IclAttacher::new(&counter, reject(1024));

        let err = attacher.expand(&chunks, &seeds(vec![example("x", 4)])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidSeedExample { index: 1, .. })
        ));
        assert!(err.to_string().contains("has 4 question-answer pairs"));
    }
}
