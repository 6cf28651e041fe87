// ============================================================
// Layer 5 — RAFT Sampler
// ============================================================
// Retrieval-augmented fine-tuning: each record's own context
// (the "golden" document) is mixed with distractor documents
// drawn from every other context in the dataset.
//
//   with probability p      → golden + (n − 1) distractors
//   with probability 1 − p  → n distractors, no golden
//
// The selection is shuffled so the golden document's position
// carries no signal, then rendered in front of the first user
// message:
//
//   Document:\n<d1>\n\n
//   Document:\n<d2>\n\n
//
//   <user instruction>
//
// The random source is passed in by the caller; tests seed it.

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::domain::error::PipelineError;
use crate::domain::record::{KnowledgeRecord, RecordMetadata};

pub const DEFAULT_RAFT_P: f64            = 0.4;
pub const DEFAULT_DOCS_IN_CONTEXT: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct RaftSampler {
    p:                   f64,
    num_docs_in_context: usize,
}

impl Default for RaftSampler {
    fn default() -> Self {
        Self::new(DEFAULT_RAFT_P, DEFAULT_DOCS_IN_CONTEXT)
    }
}

impl RaftSampler {
    pub fn new(p: f64, num_docs_in_context: usize) -> Self {
        Self { p, num_docs_in_context }
    }

    /// Inline a sampled document block into every record, consuming
    /// the records' separate `context` field.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        records: Vec<KnowledgeRecord>,
        rng:     &mut R,
    ) -> Result<Vec<KnowledgeRecord>> {
        let _span = tracing::info_span!("raft", p = self.p, num_docs = self.num_docs_in_context)
            .entered();

        let contexts = records
            .iter()
            .map(|r| {
                r.context.clone().ok_or_else(|| PipelineError::MissingContext { id: r.id.clone() })
            })
            .collect::<Result<Vec<String>, PipelineError>>()?;

        // Distinct contexts in first-seen order
        let mut seen = HashSet::new();
        let pool: Vec<&str> = contexts
            .iter()
            .map(String::as_str)
            .filter(|c| seen.insert(*c))
            .collect();

        if pool.len() == 1 {
            tracing::info!("Only 1 unique document found. Turning off RAFT styling");
        } else if pool.len() > 1 && pool.len() - 1 < self.num_docs_in_context {
            tracing::info!(
                "Number of unique documents is {} which is less than {}. Using all the documents in the RAFT context",
                pool.len() - 1,
                self.num_docs_in_context
            );
        }

        let suffix = format!("_raft_p{:?}", self.p);
        let mut out = Vec::with_capacity(records.len());

        for (mut record, golden) in records.into_iter().zip(contexts.iter()) {
            let mut docs = self.pick_documents(golden, &pool, rng);
            docs.shuffle(rng);
            let block = render_context(&docs);

            let user = record
                .first_user_index()
                .ok_or_else(|| PipelineError::MissingUserTurn { id: record.id.clone() })?;
            let instruction = std::mem::take(&mut record.messages[user].content);
            record.messages[user].content = format!("{block}\n\n{instruction}");

            let mut metadata = RecordMetadata::decode(&record.metadata)?;
            metadata.dataset.push_str(&suffix);
            record.metadata = metadata.encode()?;
            record.context  = None;

            out.push(record);
        }

        tracing::info!("Built {} RAFT records from {} documents", out.len(), pool.len());
        Ok(out)
    }

    /// Documents for one record, before shuffling.
    pub fn pick_documents<'a, R: Rng + ?Sized>(
        &self,
        golden: &'a str,
        pool:   &[&'a str],
        rng:    &mut R,
    ) -> Vec<&'a str> {
        let distractors: Vec<&str> = pool.iter().copied().filter(|d| *d != golden).collect();
        if distractors.is_empty() {
            return vec![golden];
        }

        if rng.gen::<f64>() < self.p {
            let k = self.num_docs_in_context.saturating_sub(1);
            let mut docs: Vec<&str> = distractors.choose_multiple(rng, k).copied().collect();
            docs.push(golden);
            docs
        } else {
            distractors
                .choose_multiple(rng, self.num_docs_in_context)
                .copied()
                .collect()
        }
    }
}

pub fn render_context(docs: &[&str]) -> String {
    docs.iter()
        .map(|d| format!("Document:\n{d}\n\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Message;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DOCS: &[&str] = &["doc alpha", "doc beta", "doc gamma", "doc delta", "doc epsilon", "doc zeta"];

    fn record(context: &str, question: &str) -> KnowledgeRecord {
        let metadata = RecordMetadata {
            dataset: "document_knowledge_qa".to_string(),
            domain:  "science".to_string(),
            ..Default::default()
        };
        let mut r = KnowledgeRecord::new(
            vec![Message::user(question), Message::assistant("answer")],
            &metadata,
        )
        .unwrap();
        r.context = Some(context.to_string());
        r
    }

    fn records() -> Vec<KnowledgeRecord> {
        DOCS.iter().map(|d| record(d, &format!("about {d}?"))).collect()
    }

    fn golden_block(doc: &str) -> String {
        format!("Document:\n{doc}\n\n")
    }

    #[test]
    fn test_p_one_always_includes_golden() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = RaftSampler::new(1.0, 4).augment(records(), &mut rng).unwrap();

        for (r, doc) in out.iter().zip(DOCS) {
            let content = &r.messages[0].content;
            assert!(content.contains(&golden_block(doc)));
            assert_eq!(content.matches("Document:\n").count(), 4);
            assert!(content.ends_with(&format!("\n\nabout {doc}?")));
            assert!(r.context.is_none());
        }
    }

    #[test]
    fn test_p_zero_never_includes_golden() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = RaftSampler::new(0.0, 4).augment(records(), &mut rng).unwrap();

        for (r, doc) in out.iter().zip(DOCS) {
            let content = &r.messages[0].content;
            assert!(!content.contains(&golden_block(doc)));
            assert_eq!(content.matches("Document:\n").count(), 4);
        }
    }

    #[test]
    fn test_single_document_pool_is_golden_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = RaftSampler::new(0.0, 4)
            .augment(vec![record("only doc", "q1"), record("only doc", "q2")], &mut rng)
            .unwrap();

        assert_eq!(out[0].messages[0].content, "Document:\nonly doc\n\n\n\nq1");
    }

    #[test]
    fn test_small_pool_uses_all_distractors() {
        let mut rng     = StdRng::seed_from_u64(3);
        let sampler     = RaftSampler::new(1.0, 4);
        let pool        = ["a", "b", "c"];
        let mut docs    = sampler.pick_documents("a", &pool, &mut rng);
        docs.sort();
        assert_eq!(docs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_metadata_gets_raft_suffix() {
        let mut rng = StdRng::seed_from_u64(5);
        let out = RaftSampler::new(0.4, 4).augment(records(), &mut rng).unwrap();
        let metadata = RecordMetadata::decode(&out[0].metadata).unwrap();
        assert_eq!(metadata.dataset, "document_knowledge_qa_raft_p0.4");
    }

    #[test]
    fn test_user_turn_found_after_other_turns() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut r   = record("doc", "question");
        r.messages.insert(0, Message::assistant("greeting"));
        let out = RaftSampler::new(1.0, 2).augment(vec![r], &mut rng).unwrap();
        assert_eq!(out[0].messages[0].content, "greeting");
        assert!(out[0].messages[1].content.ends_with("\n\nquestion"));
    }

    #[test]
    fn test_record_without_context_is_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut r   = record("doc", "q");
        r.context   = None;
        assert!(RaftSampler::default().augment(vec![r], &mut rng).is_err());
    }
}
