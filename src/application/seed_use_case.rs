// ============================================================
// Layer 2 — SeedUseCase
// ============================================================
// Builds the seed dataset for knowledge generation from a
// directory holding chunks.jsonl and a directory holding
// qna.yaml:
//
//   Step 1: Check both directories and files exist
//   Step 2: Load and validate the seed examples
//   Step 3: Group chunks by source file
//   Step 4: Attach ICL examples per file (oversized → error)
//   Step 5: Write the concatenated records
//
// Also hosts `select`: a random sample of chunks a human can
// turn into hand-written seed examples.

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::seeded_rng;
use crate::data::{
    dataset::write_jsonl,
    icl::{IclAttacher, OversizePolicy, DEFAULT_ICL_MAX_TOKENS, DEFAULT_ICL_MIN_TOKENS},
    loader::{
        load_seed_file, read_chunk_store, require_dir, require_file, CHUNK_STORE, SEED_FILE,
        SELECTED_CHUNKS,
    },
};
use crate::domain::{
    chunk::{group_by_file, ChunkEntry},
    error::PipelineError,
    seed::IclRecord,
    traits::TokenCounter,
};
use crate::infra::tokenizer_store::{open_token_counter, DEFAULT_TOKENIZER};

// ─── SeedDatasetBuilder ───────────────────────────────────────────────────────
pub struct SeedDatasetBuilder<'a> {
    counter:         &'a dyn TokenCounter,
    max_token_count: usize,
    min_tokens:      usize,
}

impl<'a> SeedDatasetBuilder<'a> {
    pub fn new(counter: &'a dyn TokenCounter) -> Self {
        Self {
            counter,
            max_token_count: DEFAULT_ICL_MAX_TOKENS,
            min_tokens:      DEFAULT_ICL_MIN_TOKENS,
        }
    }

    pub fn limits(mut self, max_token_count: usize, min_tokens: usize) -> Self {
        self.max_token_count = max_token_count;
        self.min_tokens      = min_tokens;
        self
    }

    pub fn build(&self, chunks_dir: &Path, seed_dir: &Path) -> Result<Vec<IclRecord>> {
        let _span = tracing::info_span!("seed_dataset").entered();

        // ── Step 1: Inputs must exist ────────────────────────────────────────
        let chunks_dir = require_dir(chunks_dir)?;
        let seed_dir   = require_dir(seed_dir)?;
        let seed_path  = require_file(&seed_dir, SEED_FILE)?;
        let store_path = require_file(&chunks_dir, CHUNK_STORE)?;

        // ── Step 2: Seed examples ────────────────────────────────────────────
        let seeds = load_seed_file(&seed_path)?;

        // ── Steps 3–4: Per-file ICL attachment ────────────────────────────────
        let attacher = IclAttacher::new(
            self.counter,
            OversizePolicy::Reject { max_token_count: self.max_token_count },
        )
        .min_tokens(self.min_tokens);

        let mut records = Vec::new();
        for group in group_by_file(read_chunk_store(&store_path)?) {
            let attached = attacher.attach(&group.chunks(), &seeds)?;
            tracing::info!("{}: {} seed records", group.file, attached.len());
            records.extend(attached);
        }
        Ok(records)
    }
}

// ─── SeedUseCase ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub chunks_dir:     String,
    pub seed_dir:       String,
    pub output:         String,
    pub tokenizer:      String,
    pub icl_max_tokens: usize,
    pub icl_min_tokens: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            chunks_dir:     "data/chunks".to_string(),
            seed_dir:       "data".to_string(),
            output:         "output/seed_data.jsonl".to_string(),
            tokenizer:      DEFAULT_TOKENIZER.to_string(),
            icl_max_tokens: DEFAULT_ICL_MAX_TOKENS,
            icl_min_tokens: DEFAULT_ICL_MIN_TOKENS,
        }
    }
}

pub struct SeedUseCase {
    config: SeedConfig,
}

impl SeedUseCase {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    /// Build and write the seed dataset; returns the record count.
    pub fn execute(&self) -> Result<usize> {
        let counter = open_token_counter(&self.config.tokenizer)?;
        self.run(counter.as_ref())
    }

    pub fn run(&self, counter: &dyn TokenCounter) -> Result<usize> {
        let cfg     = &self.config;
        let records = SeedDatasetBuilder::new(counter)
            .limits(cfg.icl_max_tokens, cfg.icl_min_tokens)
            .build(Path::new(&cfg.chunks_dir), Path::new(&cfg.seed_dir))?;

        write_jsonl(Path::new(&cfg.output), &records)?;
        tracing::info!("Wrote {} seed records to '{}'", records.len(), cfg.output);
        Ok(records.len())
    }
}

// ─── Random chunk selection ───────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectConfig {
    pub chunks_file: String,
    pub output_dir:  String,
    pub count:       usize,
    pub seed:        Option<u64>,
}

/// `count` distinct chunk entries, in random order.
pub fn select_random_chunks<R: Rng + ?Sized>(
    entries: &[ChunkEntry],
    count:   usize,
    rng:     &mut R,
) -> Result<Vec<ChunkEntry>, PipelineError> {
    if count > entries.len() {
        return Err(PipelineError::NotEnoughChunks {
            requested: count,
            available: entries.len(),
        });
    }
    Ok(entries.choose_multiple(rng, count).cloned().collect())
}

/// Sample chunks into `<output_dir>/selected_chunks.jsonl`.
pub fn save_random_chunk_selection(config: &SelectConfig) -> Result<PathBuf> {
    let entries  = read_chunk_store(Path::new(&config.chunks_file))?;
    let mut rng  = seeded_rng(config.seed);
    let selected = select_random_chunks(&entries, config.count, &mut rng)?;

    let path = Path::new(&config.output_dir).join(SELECTED_CHUNKS);
    write_jsonl(&path, &selected)?;
    tracing::info!("Selected {} of {} chunks into '{}'", selected.len(), entries.len(), path.display());
    Ok(path)
}
