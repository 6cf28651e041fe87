// ============================================================
// Layer 2 — ProcessUseCase
// ============================================================
// Turns parsed documents (or whole markdown files) into the
// ICL-expanded records the QA generator consumes:
//
//   Step 1: Load tokenizer + seed examples   (Layer 6 / Layer 4)
//   Step 2: Chunk every document             (Layer 4 - chunker)
//   Step 3: Fuse short chunks                (Layer 4 - fuser)
//   Step 4: Attach ICL examples              (Layer 4 - icl)
//   Step 5: Write records (+ chunk store)    (Layer 4 - dataset)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    chunker::{ChunkAccumulator, DEFAULT_MAX_TOKENS_PER_CHUNK},
    dataset::write_jsonl,
    fuser::{ChunkFuser, DEFAULT_FUSE_THRESHOLD_WORDS},
    icl::{
        IclAttacher, OversizePolicy, DEFAULT_ICL_MAX_TOKENS, DEFAULT_ICL_MIN_TOKENS,
        DEFAULT_RESPLIT_CTX_SIZE, DEFAULT_RESPLIT_WORDS,
    },
    loader::{load_markdown, load_seed_file, ParsedDocLoader},
};
use crate::domain::{
    chunk::{Chunk, ChunkEntry},
    document::DocumentElement,
    seed::IclRecord,
    traits::{PrefixBreak, TokenCounter},
};
use crate::infra::tokenizer_store::{open_token_counter, DEFAULT_TOKENIZER};

// ─── Processing Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Directory of parsed-document JSON files
    pub parsed_dir:           Option<String>,
    /// Markdown files, each processed as one chunk
    pub markdown_files:       Vec<String>,
    pub seed_file:            String,
    pub output:               String,
    /// Where to also write the fused chunks as chunks.jsonl
    pub chunks_output:        Option<String>,
    pub tokenizer:            String,
    pub max_tokens_per_chunk: usize,
    pub fuse_threshold_words: usize,
    pub same_page_together:   bool,
    pub break_prefixes:       Vec<String>,
    pub icl_max_tokens:       usize,
    pub icl_min_tokens:       usize,
    pub resplit_ctx_size:     usize,
    pub resplit_words:        usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            parsed_dir:           Some("data/parsed".to_string()),
            markdown_files:       Vec::new(),
            seed_file:            "data/qna.yaml".to_string(),
            output:               "output/icl_records.jsonl".to_string(),
            chunks_output:        None,
            tokenizer:            DEFAULT_TOKENIZER.to_string(),
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
            fuse_threshold_words: DEFAULT_FUSE_THRESHOLD_WORDS,
            same_page_together:   false,
            break_prefixes:       Vec::new(),
            icl_max_tokens:       DEFAULT_ICL_MAX_TOKENS,
            icl_min_tokens:       DEFAULT_ICL_MIN_TOKENS,
            resplit_ctx_size:     DEFAULT_RESPLIT_CTX_SIZE,
            resplit_words:        DEFAULT_RESPLIT_WORDS,
        }
    }
}

/// Counts reported back to the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    pub documents: usize,
    pub chunks:    usize,
    pub records:   usize,
}

// ─── ProcessUseCase ───────────────────────────────────────────────────────────
pub struct ProcessUseCase {
    config: ProcessConfig,
}

impl ProcessUseCase {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ProcessReport> {
        let counter = open_token_counter(&self.config.tokenizer)?;
        self.run(counter.as_ref())
    }

    /// Run the pipeline with an explicit token counter.
    pub fn run(&self, counter: &dyn TokenCounter) -> Result<ProcessReport> {
        let cfg = &self.config;

        // ── Step 1: Seed examples ────────────────────────────────────────────
        let seeds = load_seed_file(Path::new(&cfg.seed_file))?;
        tracing::info!("Using {} seed examples from '{}'", seeds.seed_examples.len(), cfg.seed_file);

        // ── Steps 2–3: Chunk and fuse each document ──────────────────────────
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut documents          = 0usize;

        if let Some(dir) = &cfg.parsed_dir {
            for source in ParsedDocLoader::new(dir)?.load_all()? {
                let texts = self.chunk_elements(counter, &source.elements)?;
                tracing::info!("{}: {} chunks", source.name, texts.len());
                chunks.extend(Chunk::sequence(&source.name, texts));
                documents += 1;
            }
        }

        let markdown: Vec<PathBuf> = cfg.markdown_files.iter().map(PathBuf::from).collect();
        for doc in load_markdown(&markdown)? {
            chunks.push(Chunk::new(doc.source, 0, doc.text));
            documents += 1;
        }

        if let Some(path) = &cfg.chunks_output {
            let entries: Vec<ChunkEntry> = chunks
                .iter()
                .map(|c| ChunkEntry {
                    file:     c.source.clone(),
                    chunk:    c.text.clone(),
                    metadata: serde_json::json!({}),
                })
                .collect();
            write_jsonl(Path::new(path), &entries)?;
        }

        // ── Step 4: Attach ICL examples per document ──────────────────────────
        let policy = OversizePolicy::Resplit {
            max_token_count:  cfg.icl_max_tokens,
            server_ctx_size:  cfg.resplit_ctx_size,
            chunk_word_count: cfg.resplit_words,
        };
        let attacher = IclAttacher::new(counter, policy).min_tokens(cfg.icl_min_tokens);

        let mut records: Vec<IclRecord> = Vec::new();
        for group in chunks.chunk_by(|a, b| a.source == b.source) {
            records.extend(attacher.attach(group, &seeds)?);
        }

        // ── Step 5: Persist ──────────────────────────────────────────────────
        write_jsonl(Path::new(&cfg.output), &records)?;
        tracing::info!("Wrote {} ICL records to '{}'", records.len(), cfg.output);

        Ok(ProcessReport {
            documents,
            chunks: chunks.len(),
            records: records.len(),
        })
    }

    /// Accumulate and fuse the chunks of one document.
    pub fn chunk_elements(
        &self,
        counter:  &dyn TokenCounter,
        elements: &[DocumentElement],
    ) -> Result<Vec<String>> {
        let cfg   = &self.config;
        let rule  = PrefixBreak::new(cfg.break_prefixes.iter().cloned());
        let mut chunker = ChunkAccumulator::new(counter, cfg.max_tokens_per_chunk)
            .same_page_together(cfg.same_page_together);
        if !cfg.break_prefixes.is_empty() {
            chunker = chunker.with_break_rule(&rule);
        }

        let chunks = chunker.chunk(elements)?;
        Ok(ChunkFuser::new(cfg.fuse_threshold_words).fuse(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::read_jsonl;
    use crate::infra::tokenizer_store::HeuristicTokenCounter;
    use std::fs;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    fn seed_yaml() -> String {
        let mut yaml = String::from("document_outline: Test outline\ndomain: testing\nseed_examples:\n");
        for i in 1..=5 {
            yaml.push_str(&format!("  - context: context {i}\n    questions_and_answers:\n"));
            for j in 1..=3 {
                yaml.push_str(&format!("      - question: q{i}.{j}\n        answer: a{i}.{j}\n"));
            }
        }
        yaml
    }

    fn paragraph(text: &str, page: u32) -> String {
        format!(r#"{{"type": "paragraph", "text": "{text}", "prov": [{{"page": {page}}}]}}"#)
    }

    #[test]
    fn test_three_paragraphs_become_two_chunks() {
        let use_case = ProcessUseCase::new(ProcessConfig::default());
        let elements = vec![
            DocumentElement::paragraph(words(50, "one"), 1),
            DocumentElement::paragraph(words(600, "two"), 1),
            DocumentElement::paragraph(words(50, "three"), 1),
        ];

        let chunks = use_case.chunk_elements(&HeuristicTokenCounter, &elements).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], words(50, "one"));
        let middle = words(600, "two");
        assert_eq!(chunks.iter().filter(|c| c.contains(&middle)).count(), 1);
    }

    #[test]
    fn test_break_prefixes_split_chunks() {
        let config = ProcessConfig {
            break_prefixes:       vec!["Chapter".to_string()],
            fuse_threshold_words: 0,
            ..Default::default()
        };
        let use_case = ProcessUseCase::new(config);
        let elements = vec![
            DocumentElement::paragraph("Chapter one opens the story here", 1),
            DocumentElement::paragraph("Chapter two continues the story here", 1),
        ];

        let chunks = use_case.chunk_elements(&HeuristicTokenCounter, &elements).unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_end_to_end_writes_icl_records() {
        let dir    = tempfile::tempdir().unwrap();
        let parsed = dir.path().join("parsed");
        fs::create_dir(&parsed).unwrap();

        let body = format!(
            r#"{{"main-text": [{}, {}, {}]}}"#,
            paragraph(&words(150, "alpha"), 1),
            paragraph(&words(300, "beta"), 1),
            paragraph(&words(20, "gamma"), 2),
        );
        fs::write(parsed.join("report.json"), body).unwrap();
        fs::write(dir.path().join("qna.yaml"), seed_yaml()).unwrap();

        let output = dir.path().join("out").join("records.jsonl");
        let chunks = dir.path().join("chunks.jsonl");
        let config = ProcessConfig {
            parsed_dir:    Some(parsed.display().to_string()),
            seed_file:     dir.path().join("qna.yaml").display().to_string(),
            output:        output.display().to_string(),
            chunks_output: Some(chunks.display().to_string()),
            ..Default::default()
        };

        let report = ProcessUseCase::new(config).run(&HeuristicTokenCounter).unwrap();

        // 150 + 300 words trips the budget: [alpha], [beta + gamma]
        assert_eq!(report.documents, 1);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.records, 10);

        let records: Vec<IclRecord> = read_jsonl(&output).unwrap();
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.document_title == "report"));
        assert_eq!(records[0].icl_query_1, "q1.1");

        let entries: Vec<ChunkEntry> = read_jsonl(&chunks).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file, "report");
    }
}
