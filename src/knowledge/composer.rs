// ============================================================
// Layer 5 — Knowledge Dataset Composer
// ============================================================
// Builds chat-format training records from generated rows:
//
//   1. clean every response ([END] / [ANSWER] markers removed)
//   2. optionally cap QA pairs per document: the first N rows of
//      each document are unmasked (pretraining-eligible), the
//      rest masked; unmasked rows come first in the output
//   3. lay out each row as a user/assistant pair, with the
//      document either inlined in the user turn or kept apart
//      in `context` for RAFT sampling
//
// Two shapes sit on top of that:
//
//   regular     — context kept apart, RAFT-sampled, plus the
//                 summarization auxiliary rows
//   pretraining — context inlined, every uncapped row unmasked, plus the
//                 summarization auxiliary rows (also unmasked)

use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::record::{
    DocumentOrigin, GeneratedRecord, KnowledgeRecord, Message, RecordMetadata,
};
use crate::knowledge::raft::RaftSampler;
use crate::knowledge::summarization::create_summarization_task_dataset;

pub const KNOWLEDGE_QA_DATASET: &str = "document_knowledge_qa";

const RESPONSE_MARKERS: &[&str] = &["[END]", "[ANSWER]"];

/// Strip generation markers and surrounding whitespace.
pub fn clean_response(response: &str) -> String {
    RESPONSE_MARKERS
        .iter()
        .fold(response.to_string(), |text, marker| text.replace(marker, ""))
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaDatasetOptions {
    /// Keep the document in `context` instead of the user turn
    pub keep_context_separate: bool,

    /// Prefix the inlined document with the document outline
    pub keep_document_outline: bool,

    /// Drop rows marked as masked by `keep_no_qa_per_doc`
    pub filter_non_pre_training: bool,

    pub keep_no_qa_per_doc: Option<usize>,
}

/// Mark the first `keep` rows of every document unmasked and the
/// rest masked. Unmasked rows are returned first, each group in
/// input order. Without a cap every row is returned unmarked.
pub fn mask_qa_per_doc(
    records: Vec<GeneratedRecord>,
    keep:    Option<usize>,
) -> Vec<(GeneratedRecord, Option<bool>)> {
    let Some(keep) = keep else {
        return records.into_iter().map(|r| (r, None)).collect();
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unmasked = Vec::new();
    let mut masked   = Vec::new();

    for record in records {
        let count = seen.entry(record.document.clone()).or_insert(0);
        *count += 1;
        if *count <= keep {
            unmasked.push((record, Some(true)));
        } else {
            masked.push((record, Some(false)));
        }
    }

    tracing::debug!("Capped QA per document: {} unmasked, {} masked", unmasked.len(), masked.len());
    unmasked.extend(masked);
    unmasked
}

pub fn generate_knowledge_qa_dataset(
    records: &[GeneratedRecord],
    options: &QaDatasetOptions,
) -> Result<Vec<KnowledgeRecord>> {
    let cleaned: Vec<GeneratedRecord> = records
        .iter()
        .map(|r| GeneratedRecord { response: clean_response(&r.response), ..r.clone() })
        .collect();

    let mut rows = mask_qa_per_doc(cleaned, options.keep_no_qa_per_doc);
    if options.filter_non_pre_training {
        rows.retain(|(_, unmask)| *unmask != Some(false));
    }

    rows.into_iter()
        .map(|(record, unmask)| {
            let mut row = qa_row(&record, options)?;
            row.unmask  = unmask;
            Ok(row)
        })
        .collect()
}

fn qa_row(record: &GeneratedRecord, options: &QaDatasetOptions) -> Result<KnowledgeRecord> {
    let mut metadata = RecordMetadata {
        sdg_document: Some(record.document.clone()),
        dataset:      KNOWLEDGE_QA_DATASET.to_string(),
        domain:       record.domain.clone(),
        ..Default::default()
    };
    if let DocumentOrigin::Augmented { raw_document, dataset_type } = &record.origin {
        metadata.raw_document = Some(raw_document.clone());
        metadata.dataset_type = Some(dataset_type.clone());
    }

    let answer = Message::assistant(record.response.clone());

    if options.keep_context_separate {
        let mut row = KnowledgeRecord::new(vec![Message::user(record.question.clone()), answer], &metadata)?;
        row.context = Some(record.document.clone());
        return Ok(row);
    }

    let prompt = match (&record.document_outline, options.keep_document_outline) {
        (Some(outline), true) => format!("{outline}\n{}\n\n{}", record.document, record.question),
        _                     => format!("{}\n\n{}", record.document, record.question),
    };
    Ok(KnowledgeRecord::new(vec![Message::user(prompt), answer], &metadata)?)
}

// ─── Dataset shapes ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetShape {
    /// Context sampled through RAFT
    Regular,
    /// Context inlined and every record unmasked
    Pretraining,
}

#[derive(Debug, Clone)]
pub struct KnowledgeComposer {
    raft:          RaftSampler,
    add_auxiliary: bool,
    /// Cap, filter and outline policy; the layout flag is set per shape
    options:       QaDatasetOptions,
}

impl Default for KnowledgeComposer {
    fn default() -> Self {
        Self::new(RaftSampler::default(), true)
    }
}

impl KnowledgeComposer {
    pub fn new(raft: RaftSampler, add_auxiliary: bool) -> Self {
        Self { raft, add_auxiliary, options: QaDatasetOptions::default() }
    }

    pub fn with_options(mut self, options: QaDatasetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn compose<R: Rng + ?Sized>(
        &self,
        shape:   DatasetShape,
        records: &[GeneratedRecord],
        rng:     &mut R,
    ) -> Result<Vec<KnowledgeRecord>> {
        match shape {
            DatasetShape::Regular     => self.regular(records, rng),
            DatasetShape::Pretraining => self.pretraining(records, rng),
        }
    }

    pub fn regular<R: Rng + ?Sized>(
        &self,
        records: &[GeneratedRecord],
        rng:     &mut R,
    ) -> Result<Vec<KnowledgeRecord>> {
        let _span = tracing::info_span!("compose", shape = "regular").entered();

        let options = QaDatasetOptions { keep_context_separate: true, ..self.options.clone() };
        let qa      = generate_knowledge_qa_dataset(records, &options)?;
        let mut out = self.raft.augment(qa, rng)?;

        if self.add_auxiliary {
            out.extend(create_summarization_task_dataset(records, rng)?);
        }
        tracing::info!("Composed {} regular records", out.len());
        Ok(out)
    }

    pub fn pretraining<R: Rng + ?Sized>(
        &self,
        records: &[GeneratedRecord],
        rng:     &mut R,
    ) -> Result<Vec<KnowledgeRecord>> {
        let _span = tracing::info_span!("compose", shape = "pretraining").entered();

        let options = QaDatasetOptions { keep_context_separate: false, ..self.options.clone() };
        let mut out = generate_knowledge_qa_dataset(records, &options)?;
        if self.add_auxiliary {
            out.extend(create_summarization_task_dataset(records, rng)?);
        }
        // Rows masked by the per-document cap stay masked.
        for record in out.iter_mut().filter(|r| r.unmask != Some(false)) {
            record.unmask = Some(true);
        }
        tracing::info!("Composed {} pretraining records", out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::DatasetType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(document: &str, question: &str, response: &str) -> GeneratedRecord {
        GeneratedRecord::new(document, question, response, "geography")
    }

    #[test]
    fn test_clean_response_strips_markers() {
        assert_eq!(clean_response("The capital is Paris.[END]"), "The capital is Paris.");
        assert_eq!(clean_response("  [ANSWER] Yes. [END] \n"), "Yes.");
    }

    #[test]
    fn test_cap_marks_first_occurrences() {
        let rows: Vec<_> = (0..5).map(|i| row("doc", &format!("q{i}"), "a")).collect();
        let capped = mask_qa_per_doc(rows, Some(2));

        let flags: Vec<_> = capped.iter().map(|(r, u)| (r.question.as_str(), *u)).collect();
        assert_eq!(
            flags,
            vec![
                ("q0", Some(true)),
                ("q1", Some(true)),
                ("q2", Some(false)),
                ("q3", Some(false)),
                ("q4", Some(false)),
            ]
        );
    }

    #[test]
    fn test_unmasked_rows_come_first() {
        let rows = vec![row("a", "a1", "x"), row("a", "a2", "x"), row("b", "b1", "x")];
        let capped = mask_qa_per_doc(rows, Some(1));
        let order: Vec<_> = capped.iter().map(|(r, _)| r.question.as_str()).collect();
        assert_eq!(order, vec!["a1", "b1", "a2"]);
    }

    #[test]
    fn test_filter_drops_masked_rows() {
        let rows: Vec<_> = (0..4).map(|i| row("doc", &format!("q{i}"), "a")).collect();
        let options = QaDatasetOptions {
            keep_no_qa_per_doc: Some(3),
            filter_non_pre_training: true,
            ..Default::default()
        };
        let out = generate_knowledge_qa_dataset(&rows, &options).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.unmask == Some(true)));
    }

    #[test]
    fn test_inline_layout_and_metadata() {
        let rows = vec![row("Paris is in France.", "Where is Paris?", "In France.[END]")];
        let out  = generate_knowledge_qa_dataset(&rows, &QaDatasetOptions::default()).unwrap();

        assert_eq!(out[0].messages[0].content, "Paris is in France.\n\nWhere is Paris?");
        assert_eq!(out[0].messages[1].content, "In France.");
        assert!(out[0].context.is_none());
        assert!(out[0].unmask.is_none());

        let metadata = RecordMetadata::decode(&out[0].metadata).unwrap();
        assert_eq!(metadata.dataset, KNOWLEDGE_QA_DATASET);
        assert_eq!(metadata.sdg_document.as_deref(), Some("Paris is in France."));
        assert!(metadata.raw_document.is_none());
    }

    #[test]
    fn test_outline_is_prefixed_when_requested() {
        let rows    = vec![row("Body.", "Q?", "A").with_outline("Outline")];
        let options = QaDatasetOptions { keep_document_outline: true, ..Default::default() };
        let out     = generate_knowledge_qa_dataset(&rows, &options).unwrap();
        assert_eq!(out[0].messages[0].content, "Outline\nBody.\n\nQ?");
    }

    #[test]
    fn test_separate_context_layout() {
        let rows    = vec![row("Body.", "Q?", "A")];
        let options = QaDatasetOptions { keep_context_separate: true, ..Default::default() };
        let out     = generate_knowledge_qa_dataset(&rows, &options).unwrap();
        assert_eq!(out[0].messages[0].content, "Q?");
        assert_eq!(out[0].context.as_deref(), Some("Body."));
    }

    #[test]
    fn test_augmented_rows_carry_origin_metadata() {
        let rows = vec![row("Summary.", "Q?", "A").with_origin("Raw.", DatasetType::SummaryDetailed)];
        let out  = generate_knowledge_qa_dataset(&rows, &QaDatasetOptions::default()).unwrap();
        let metadata = RecordMetadata::decode(&out[0].metadata).unwrap();
        assert_eq!(metadata.raw_document.as_deref(), Some("Raw."));
        assert_eq!(metadata.dataset_type, Some(DatasetType::SummaryDetailed));
    }

    #[test]
    fn test_pretraining_shape_unmasks_everything() {
        let mut rng = StdRng::seed_from_u64(2);
        let rows = vec![
            row("Doc one.", "Q1?", "A1"),
            row("Summary.", "Q2?", "A2").with_origin("Raw.", DatasetType::SummaryExtractive),
        ];
        let out = KnowledgeComposer::default().pretraining(&rows, &mut rng).unwrap();

        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.unmask == Some(true)));
        assert_eq!(out[0].messages[0].content, "Doc one.\n\nQ1?");
    }

    #[test]
    fn test_regular_shape_samples_context() {
        let mut rng = StdRng::seed_from_u64(2);
        let rows: Vec<_> = ["d1", "d2", "d3"].iter().map(|d| row(d, "Q?", "A")).collect();
        let composer = KnowledgeComposer::new(RaftSampler::new(1.0, 2), false);
        let out = composer.compose(DatasetShape::Regular, &rows, &mut rng).unwrap();

        assert_eq!(out.len(), 3);
        for (record, doc) in out.iter().zip(["d1", "d2", "d3"]) {
            assert!(record.context.is_none());
            assert!(record.messages[0].content.contains(&format!("Document:\n{doc}\n\n")));
            let metadata = RecordMetadata::decode(&record.metadata).unwrap();
            assert_eq!(metadata.dataset, "document_knowledge_qa_raft_p1.0");
        }
    }

    #[test]
    fn test_composer_options_reach_both_shapes() {
        let rows: Vec<_> = (0..4).map(|i| row("doc", &format!("q{i}"), "a")).collect();
        let options = QaDatasetOptions { keep_no_qa_per_doc: Some(1), ..Default::default() };
        let composer = KnowledgeComposer::new(RaftSampler::default(), false).with_options(options);

        let mut rng = StdRng::seed_from_u64(4);
        let regular = composer.regular(&rows, &mut rng).unwrap();
        let flags: Vec<_> = regular.iter().map(|r| r.unmask).collect();
        assert_eq!(flags, vec![Some(true), Some(false), Some(false), Some(false)]);

        let pretraining = composer.pretraining(&rows, &mut rng).unwrap();
        assert_eq!(pretraining.iter().filter(|r| r.unmask == Some(true)).count(), 1);
        assert_eq!(pretraining.iter().filter(|r| r.unmask == Some(false)).count(), 3);
    }
}
