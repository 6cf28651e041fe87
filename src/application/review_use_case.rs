// ============================================================
// Layer 2 — Seed Example Review
// ============================================================
// Human-facing checks on a qna.yaml before it feeds the
// pipeline. Review never aborts: it collects diagnostics for
// the CLI to print. Viewing an example that does not exist is
// a validation error.

use anyhow::Result;
use std::path::Path;

use crate::data::loader::load_raw_seed_file;
use crate::domain::error::PipelineError;
use crate::domain::seed::{SeedExample, SeedReview};

pub fn review_seed_file(path: &Path, min_seed_examples: usize, num_qa_pairs: usize) -> Result<SeedReview> {
    tracing::info!("Reviewing seed examples file at {}", path.display());
    let review = load_raw_seed_file(path)?.review(min_seed_examples, num_qa_pairs);
    if !review.is_valid() {
        tracing::warn!("Seed examples validation found {} issue(s)", review.errors.len());
    }
    Ok(review)
}

/// Seed example `index` (zero-based).
pub fn view_seed_example(path: &Path, index: usize) -> Result<SeedExample> {
    let examples  = load_raw_seed_file(path)?.seed_examples.unwrap_or_default();
    let available = examples.len();

    let example = examples
        .into_iter()
        .nth(index)
        .ok_or(PipelineError::SeedExampleOutOfRange { index, available })?;

    Ok(SeedExample {
        context:               example.context.unwrap_or_default(),
        questions_and_answers: example.questions_and_answers.unwrap_or_default(),
    })
}
