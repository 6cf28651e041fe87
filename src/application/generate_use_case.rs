// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Drives QA generation for one contribution:
//
//   Step 1: Read chunks.jsonl, group chunks by source file
//   Step 2: Drop chunks of `min_chunk_chars` characters or fewer
//   Step 3: Replace any stale qagen-<name>.json artifact
//   Step 4: Call the generator once per source file
//   Step 5: Re-read the artifact and merge pairs by chunk id
//   Step 6: Write qna.yaml (one seed example per chunk)
//
// A generator failure aborts the run; whatever was written to
// the artifact before the failure is not used.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::{
    dataset::{read_jsonl, remove_stale},
    loader::{read_chunk_store, save_seed_file, SEED_FILE},
};
use crate::domain::{
    chunk::{Chunk, FileChunks, group_by_file},
    qa_pair::{merge_by_chunk, QaRecord},
    seed::{SeedExample, SeedFile},
    traits::{GenerationStatus, QaGenerator},
};
use crate::infra::qa_service::{GeneratorSettings, OpenAiLikeGenerator};

pub const DEFAULT_MIN_CHUNK_CHARS: usize = 100;

/// `<output_dir>/qagen-<name>.json`
pub fn artifact_path(output_dir: &Path, contribution: &str) -> PathBuf {
    output_dir.join(format!("qagen-{contribution}.json"))
}

// ─── QaGenerationDriver ───────────────────────────────────────────────────────
pub struct QaGenerationDriver<'a> {
    generator:       &'a dyn QaGenerator,
    min_chunk_chars: usize,
}

/// What one generation run produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub status:   GenerationStatus,
    pub artifact: PathBuf,
    pub records:  Vec<QaRecord>,
}

impl<'a> QaGenerationDriver<'a> {
    pub fn new(generator: &'a dyn QaGenerator, min_chunk_chars: usize) -> Self {
        Self { generator, min_chunk_chars }
    }

    /// Chunks long enough to be worth generating from.
    pub fn qa_chunks(&self, file: &FileChunks) -> Vec<Chunk> {
        file.chunks()
            .into_iter()
            .filter(|c| c.text.chars().count() > self.min_chunk_chars)
            .collect()
    }

    pub fn generate(
        &self,
        contribution: &str,
        files:        &[FileChunks],
        output_dir:   &Path,
    ) -> Result<GenerationOutcome> {
        let _span = tracing::info_span!("qa_generation", contribution).entered();

        let artifact = artifact_path(output_dir, contribution);
        remove_stale(&artifact)?;
        std::fs::create_dir_all(output_dir)?;
        File::create(&artifact)?;

        let mut unparsed = 0usize;
        for file in files {
            let chunks = self.qa_chunks(file);
            tracing::info!(
                "Filtering smaller chunks out of document {}: {} of {} kept",
                file.file,
                chunks.len(),
                file.entries.len()
            );
            if chunks.is_empty() {
                continue;
            }
            if let GenerationStatus::Partial { unparsed_chunks } =
                self.generator.generate(&chunks, &artifact)?
            {
                unparsed += unparsed_chunks;
            }
        }

        let status = if unparsed == 0 {
            GenerationStatus::Success
        } else {
            GenerationStatus::Partial { unparsed_chunks: unparsed }
        };
        tracing::info!("Status for QA generation for {} is: {}", contribution, status);

        let records = read_jsonl(&artifact)?;
        Ok(GenerationOutcome { status, artifact, records })
    }
}

/// One seed example per chunk id, in first-seen order.
pub fn seed_file_from_records(records: &[QaRecord], summary: &str, domain: &str) -> SeedFile {
    SeedFile {
        seed_examples: merge_by_chunk(records)
            .into_iter()
            .map(|c| SeedExample { context: c.context, questions_and_answers: c.pairs })
            .collect(),
        document_outline: summary.to_string(),
        domain:           domain.to_string(),
    }
}

// ─── GenerateUseCase ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub contribution:    String,
    pub chunks_file:     String,
    pub output_dir:      String,
    pub api_url:         String,
    pub api_key:         String,
    pub model_id:        String,
    pub domain:          String,
    /// Contribution summary, stored as `document_outline`
    pub summary:         String,
    pub customization:   Option<String>,
    pub min_chunk_chars: usize,
    pub timeout_secs:    Option<u64>,
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Generate with the configured endpoint; returns the qna.yaml path.
    pub fn execute(&self) -> Result<(GenerationStatus, PathBuf)> {
        let cfg = &self.config;
        let generator = OpenAiLikeGenerator::new(GeneratorSettings {
            api_url:       cfg.api_url.clone(),
            api_key:       cfg.api_key.clone(),
            model_id:      cfg.model_id.clone(),
            customization: cfg.customization.clone(),
            timeout:       cfg.timeout_secs.map(Duration::from_secs),
        })?;
        self.run(&generator)
    }

    pub fn run(&self, generator: &dyn QaGenerator) -> Result<(GenerationStatus, PathBuf)> {
        let cfg        = &self.config;
        let output_dir = Path::new(&cfg.output_dir);

        // ── Step 1: Chunks grouped by file ───────────────────────────────────
        let files = group_by_file(read_chunk_store(Path::new(&cfg.chunks_file))?);

        // ── Steps 2–5: Generate ──────────────────────────────────────────────
        let outcome = QaGenerationDriver::new(generator, cfg.min_chunk_chars)
            .generate(&cfg.contribution, &files, output_dir)?;

        tracing::info!(
            "{} QA pairs in '{}'",
            outcome.records.len(),
            outcome.artifact.display()
        );

        // ── Step 6: qna.yaml ─────────────────────────────────────────────────
        let seeds     = seed_file_from_records(&outcome.records, &cfg.summary, &cfg.domain);
        let qna_path  = output_dir.join(SEED_FILE);
        save_seed_file(&qna_path, &seeds)?;

        Ok((outcome.status, qna_path))
    }
}
