// ============================================================
// Layer 4 — Loaders
// ============================================================
// Reads the pipeline's inputs from disk:
//
//   <dir>/*.json     parsed documents   → ParsedSource
//   *.md             markdown documents → Document
//   chunks.jsonl     chunk store        → Vec<ChunkEntry>
//   qna.yaml         seed examples      → SeedFile / RawSeedFile
//
// Directory and file checks fail fast with a PipelineError so a
// misconfigured run never starts on partial input.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::dataset::{read_jsonl, remove_stale};
use crate::domain::chunk::ChunkEntry;
use crate::domain::document::{Document, DocumentElement, ParsedDocument};
use crate::domain::error::PipelineError;
use crate::domain::seed::{RawSeedFile, SeedFile};

pub const SEED_FILE: &str         = "qna.yaml";
pub const CHUNK_STORE: &str       = "chunks.jsonl";
pub const SELECTED_CHUNKS: &str   = "selected_chunks.jsonl";

/// The elements of one parsed document, named after its file.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub name:     String,
    pub elements: Vec<DocumentElement>,
}

/// Loads every parsed-document JSON file from a directory.
pub struct ParsedDocLoader {
    dir: PathBuf,
}

impl ParsedDocLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let dir: PathBuf = dir.into();
        Ok(Self { dir: require_dir(&dir)? })
    }

    /// `*.json` files in the directory, sorted by name.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn load_all(&self) -> Result<Vec<ParsedSource>> {
        let mut sources = Vec::new();
        for path in self.paths()? {
            sources.push(load_parsed_document(&path)?);
        }
        tracing::info!("Loaded {} parsed documents from '{}'", sources.len(), self.dir.display());
        Ok(sources)
    }
}

pub fn load_parsed_document(path: &Path) -> Result<ParsedSource> {
    tracing::info!("Processing parsed document: {}", path.display());
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let parsed: ParsedDocument = serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not a parsed document", path.display()))?;

    Ok(ParsedSource {
        name:     document_name(path),
        elements: parsed.into_elements()?,
    })
}

/// File name up to its first '.', e.g. `paper.v2.json` → `paper`.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or("unknown")
        .to_string()
}

/// Each markdown file becomes one whole document.
pub fn load_markdown(paths: &[PathBuf]) -> Result<Vec<Document>> {
    paths
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            let source = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            tracing::debug!("Loaded markdown: {} ({} chars)", source, text.len());
            Ok(Document::new(source, text))
        })
        .collect()
}

pub fn read_chunk_store(path: &Path) -> Result<Vec<ChunkEntry>> {
    read_jsonl(path).with_context(|| format!("Cannot load chunk store '{}'", path.display()))
}

// ─── Seed examples ────────────────────────────────────────────────────────────
pub fn load_raw_seed_file(path: &Path) -> Result<RawSeedFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let raw = serde_yaml::from_str(&text)
        .with_context(|| format!("'{}' is not valid YAML", path.display()))?;
    Ok(raw)
}

pub fn load_seed_file(path: &Path) -> Result<SeedFile> {
    let seeds = SeedFile::try_from(load_raw_seed_file(path)?)?;
    tracing::debug!("Loaded {} seed examples", seeds.seed_examples.len());
    Ok(seeds)
}

/// Write `seeds` to `path`, replacing any previous file.
pub fn save_seed_file(path: &Path, seeds: &SeedFile) -> Result<()> {
    remove_stale(path)?;
    let yaml = serde_yaml::to_string(seeds)?;
    fs::write(path, yaml).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Wrote {} seed examples to '{}'", seeds.seed_examples.len(), path.display());
    Ok(())
}

// ─── Path checks ──────────────────────────────────────────────────────────────
pub fn require_dir(path: &Path) -> Result<PathBuf, PipelineError> {
    if path.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Err(PipelineError::MissingPath { path: path.to_path_buf() })
    }
}

pub fn require_file(dir: &Path, file: &'static str) -> Result<PathBuf, PipelineError> {
    let path = dir.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(PipelineError::MissingFile { dir: dir.to_path_buf(), file })
    }
}
