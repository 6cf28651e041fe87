// ============================================================
// Layer 2 — ComposeUseCase
// ============================================================
// Reads generated rows and writes one training dataset shape:
//
//   Step 1: Load generated rows          (Layer 4 - dataset)
//   Step 2: Compose the requested shape  (Layer 5 - knowledge)
//   Step 3: Write the training records   (Layer 4 - dataset)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::seeded_rng;
use crate::data::dataset::JsonlDataset;
use crate::domain::record::GeneratedRecord;
use crate::knowledge::{
    composer::{DatasetShape, KnowledgeComposer, QaDatasetOptions},
    raft::{RaftSampler, DEFAULT_DOCS_IN_CONTEXT, DEFAULT_RAFT_P},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    pub input:               String,
    pub output:              String,
    pub shape:               DatasetShape,
    pub raft_p:              f64,
    pub num_docs_in_context: usize,
    pub add_auxiliary:       bool,
    pub qa_options:          QaDatasetOptions,
    pub seed:                Option<u64>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            input:               "output/generated.jsonl".to_string(),
            output:              "output/knowledge.jsonl".to_string(),
            shape:               DatasetShape::Regular,
            raft_p:              DEFAULT_RAFT_P,
            num_docs_in_context: DEFAULT_DOCS_IN_CONTEXT,
            add_auxiliary:       true,
            qa_options:          QaDatasetOptions::default(),
            seed:                None,
        }
    }
}

pub struct ComposeUseCase {
    config: ComposeConfig,
}

impl ComposeUseCase {
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }

    /// Compose and write the dataset; returns the record count.
    pub fn execute(&self) -> Result<usize> {
        let cfg = &self.config;

        // ── Step 1: Generated rows ───────────────────────────────────────────
        let rows: JsonlDataset<GeneratedRecord> = JsonlDataset::load(Path::new(&cfg.input))?;
        if rows.is_empty() {
            tracing::warn!("No generated rows in '{}'", cfg.input);
        }
        tracing::info!("Loaded {} generated rows from '{}'", rows.len(), cfg.input);

        // ── Step 2: Compose ──────────────────────────────────────────────────
        let composer = KnowledgeComposer::new(
            RaftSampler::new(cfg.raft_p, cfg.num_docs_in_context),
            cfg.add_auxiliary,
        )
        .with_options(cfg.qa_options.clone());
        let mut rng  = seeded_rng(cfg.seed);
        let records  = JsonlDataset::new(composer.compose(cfg.shape, &rows.into_records(), &mut rng)?);

        // ── Step 3: Persist ──────────────────────────────────────────────────
        records.save(Path::new(&cfg.output))?;
        tracing::info!("Wrote {} {:?} records to '{}'", records.len(), cfg.shape, cfg.output);
        Ok(records.len())
    }
}
