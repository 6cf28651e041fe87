// ============================================================
// Layer 5 — Summarization Auxiliary Task
// ============================================================
// Rows generated from a rewrite of a document (detailed summary,
// extractive summary, atomic facts) double as a summarization
// exercise: the raw document is the input and the rewrite is
// the expected response.
//
// Each distinct rewrite yields one record whose instruction is
// drawn at random from a fixed list of phrasings for its kind.

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::domain::record::{
    DatasetType, DocumentOrigin, GeneratedRecord, KnowledgeRecord, Message, RecordMetadata,
};

const SUMMARY_DETAILED: &[&str] = &[
    "Provide me with a comprehensive summary of the given document.",
    "Prepare a detailed breakdown of the contents of the document for me.",
    "Summarize the document thoroughly, covering all important points.",
    "Create a detailed executive summary of the provided document.",
    "Compose a comprehensive overview of the document's content.",
    "Deliver a detailed synopsis of the material presented in the document.",
    "Furnish me with a detailed analysis of the document's key points.",
    "Generate a thorough summary of the main ideas in the document.",
    "Offer a detailed digest of the information contained in the document.",
    "Supply me with a comprehensive rundown of the document's contents.",
];

const SUMMARY_EXTRACTIVE: &[&str] = &[
    "Provide me with a summary of the document using extractive methods.",
    "Create an extractive summary for the given document.",
    "Generate an extractive summary from the document that was given to you.",
    "Summarize the document using extractive techniques.",
    "Create a summary of the provided document using extractive methods.",
    "Generate an extractive summary for the document provided.",
    "Using extractive techniques, summarize the given document.",
    "Create a summary of the document using extractive summarization.",
    "Generate an extractive summary of the document that was provided.",
    "Summarize the provided document using extractive summarization techniques.",
];

const SUMMARY_ATOMIC_FACTS: &[&str] = &[
    "Identify and list all atomic facts from the document.",
    "Extract all key facts from the given document.",
    "List all the important facts from the provided document.",
    "Highlight all the atomic facts present in the document.",
    "Identify and enumerate all key facts from the given text.",
    "List out all the critical information from the document.",
    "Highlight all the essential facts from the provided text.",
    "Identify and summarize all the important details from the document.",
    "Extract all the atomic facts from the given document.",
    "List all the key takeaways from the provided text.",
];

/// Instruction phrasings for a rewrite kind, if it has any.
pub fn summarization_instructions(kind: &DatasetType) -> Option<&'static [&'static str]> {
    match kind {
        DatasetType::SummaryDetailed    => Some(SUMMARY_DETAILED),
        DatasetType::SummaryExtractive  => Some(SUMMARY_EXTRACTIVE),
        DatasetType::SummaryAtomicFacts => Some(SUMMARY_ATOMIC_FACTS),
        DatasetType::BaseDocument | DatasetType::Other(_) => None,
    }
}

/// One summarization record per distinct rewritten document, in
/// first-seen order. Plain rows and base documents contribute nothing.
pub fn create_summarization_task_dataset<R: Rng + ?Sized>(
    records: &[GeneratedRecord],
    rng:     &mut R,
) -> Result<Vec<KnowledgeRecord>> {
    let _span = tracing::debug_span!("summarization", rows = records.len()).entered();

    let mut seen    = HashSet::new();
    let mut skipped = HashSet::new();
    let mut out     = Vec::new();

    for record in records {
        let DocumentOrigin::Augmented { raw_document, dataset_type } = &record.origin else {
            continue;
        };
        if *dataset_type == DatasetType::BaseDocument || !seen.insert(record.document.as_str()) {
            continue;
        }
        let phrasings = summarization_instructions(dataset_type).unwrap_or_default();
        let Some(instruction) = phrasings.choose(rng) else {
            if skipped.insert(dataset_type.as_str()) {
                tracing::warn!("No summarization instructions for dataset type '{}'; skipping", dataset_type);
            }
            continue;
        };

        let metadata = RecordMetadata {
            dataset_type: Some(dataset_type.clone()),
            raw_document: Some(raw_document.clone()),
            dataset:      format!("document_{dataset_type}"),
            domain:       record.domain.clone(),
            ..Default::default()
        };
        out.push(KnowledgeRecord::new(
            vec![
                Message::user(format!("{raw_document}\n\n{instruction}")),
                Message::assistant(record.document.clone()),
            ],
            &metadata,
        )?);
    }

    tracing::info!("Built {} summarization records", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(document: &str, kind: DatasetType) -> GeneratedRecord {
        GeneratedRecord::new(document, "q", "r", "science").with_origin("raw text", kind)
    }

    #[test]
    fn test_one_record_per_distinct_rewrite() {
        let mut rng = StdRng::seed_from_u64(11);
        let rows = vec![
            row("summary one", DatasetType::SummaryDetailed),
            row("summary one", DatasetType::SummaryDetailed),
            row("raw text", DatasetType::BaseDocument),
            GeneratedRecord::new("plain", "q", "r", "science"),
            row("facts", DatasetType::SummaryAtomicFacts),
        ];

        let out = create_summarization_task_dataset(&rows, &mut rng).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].messages[1].content, "summary one");
        assert!(out[0].messages[0].content.starts_with("raw text\n\n"));

        let instruction = out[0].messages[0].content.trim_start_matches("raw text\n\n");
        assert!(SUMMARY_DETAILED.contains(&instruction));

        let metadata = RecordMetadata::decode(&out[1].metadata).unwrap();
        assert_eq!(metadata.dataset, "document_summary_atomic_facts");
        assert_eq!(metadata.raw_document.as_deref(), Some("raw text"));
        assert_eq!(metadata.dataset_type, Some(DatasetType::SummaryAtomicFacts));
    }

    #[test]
    fn test_unknown_rewrite_kind_is_skipped() {
        let mut rng = StdRng::seed_from_u64(11);
        let rows = vec![row("odd", DatasetType::Other("paraphrase".to_string()))];
        assert!(create_summarization_task_dataset(&rows, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_every_summary_kind_has_ten_phrasings() {
        for kind in [
            DatasetType::SummaryDetailed,
            DatasetType::SummaryExtractive,
            DatasetType::SummaryAtomicFacts,
        ] {
            assert_eq!(summarization_instructions(&kind).map(<[_]>::len), Some(10));
        }
        assert!(summarization_instructions(&DatasetType::BaseDocument).is_none());
    }
}
