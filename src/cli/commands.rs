// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// One subcommand per pipeline step. Defaults match the values
// the pipeline has always used (500-token chunks, 200-word fuse
// threshold, 1024-token ICL ceiling, RAFT p = 0.4 over 4 docs).

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    compose_use_case::ComposeConfig,
    generate_use_case::{GenerateConfig, DEFAULT_MIN_CHUNK_CHARS},
    process_use_case::ProcessConfig,
    seed_use_case::{SeedConfig, SelectConfig},
};
use crate::data::{
    chunker::DEFAULT_MAX_TOKENS_PER_CHUNK,
    fuser::DEFAULT_FUSE_THRESHOLD_WORDS,
    icl::{DEFAULT_ICL_MAX_TOKENS, DEFAULT_ICL_MIN_TOKENS, DEFAULT_RESPLIT_CTX_SIZE, DEFAULT_RESPLIT_WORDS},
};
use crate::domain::seed::{MIN_SEED_EXAMPLES, QA_PAIRS_PER_EXAMPLE};
use crate::infra::tokenizer_store::DEFAULT_TOKENIZER;
use crate::knowledge::{
    composer::{DatasetShape, QaDatasetOptions},
    raft::{DEFAULT_DOCS_IN_CONTEXT, DEFAULT_RAFT_P},
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk parsed documents and attach ICL examples
    Process(ProcessArgs),

    /// Build the seed dataset from chunks.jsonl and qna.yaml
    Seed(SeedArgs),

    /// Randomly select chunks to write seed examples from
    Select(SelectArgs),

    /// Generate QA pairs for every chunk and write qna.yaml
    Generate(GenerateArgs),

    /// Check a qna.yaml for missing fields and QA counts
    Review(ReviewArgs),

    /// Print one seed example from a qna.yaml
    View(ViewArgs),

    /// Turn generated rows into a training dataset
    Compose(ComposeArgs),
}

// ─── process ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Directory of parsed-document JSON files
    #[arg(long, required_unless_present = "markdown")]
    pub parsed_dir: Option<String>,

    /// Markdown file to process as a single chunk (repeatable)
    #[arg(long)]
    pub markdown: Vec<String>,

    /// Seed examples file
    #[arg(long, default_value = "qna.yaml")]
    pub seed_file: String,

    /// Output JSONL of ICL records
    #[arg(long, default_value = "output/icl_records.jsonl")]
    pub output: String,

    /// Also write the fused chunks as a chunk store
    #[arg(long)]
    pub chunks_out: Option<String>,

    /// tokenizer.json path, Hub identifier, or "words" for the estimate
    #[arg(long, default_value = DEFAULT_TOKENIZER)]
    pub tokenizer: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS_PER_CHUNK)]
    pub max_tokens_per_chunk: usize,

    /// Chunks of at most this many words are merged into the previous one
    #[arg(long, default_value_t = DEFAULT_FUSE_THRESHOLD_WORDS)]
    pub fuse_threshold: usize,

    /// Start a new chunk whenever the page changes
    #[arg(long)]
    pub same_page_together: bool,

    /// Start a new chunk at elements beginning with this text (repeatable)
    #[arg(long = "break-on")]
    pub break_on: Vec<String>,

    /// Chunks over this many tokens are re-split before ICL attachment
    #[arg(long, default_value_t = DEFAULT_ICL_MAX_TOKENS)]
    pub icl_max_tokens: usize,

    /// Records whose document has at most this many tokens are dropped
    #[arg(long, default_value_t = DEFAULT_ICL_MIN_TOKENS)]
    pub icl_min_tokens: usize,

    #[arg(long, default_value_t = DEFAULT_RESPLIT_CTX_SIZE)]
    pub server_ctx_size: usize,

    #[arg(long, default_value_t = DEFAULT_RESPLIT_WORDS)]
    pub chunk_word_count: usize,
}

impl From<ProcessArgs> for ProcessConfig {
    fn from(a: ProcessArgs) -> Self {
        ProcessConfig {
            parsed_dir:           a.parsed_dir,
            markdown_files:       a.markdown,
            seed_file:            a.seed_file,
            output:               a.output,
            chunks_output:        a.chunks_out,
            tokenizer:            a.tokenizer,
            max_tokens_per_chunk: a.max_tokens_per_chunk,
            fuse_threshold_words: a.fuse_threshold,
            same_page_together:   a.same_page_together,
            break_prefixes:       a.break_on,
            icl_max_tokens:       a.icl_max_tokens,
            icl_min_tokens:       a.icl_min_tokens,
            resplit_ctx_size:     a.server_ctx_size,
            resplit_words:        a.chunk_word_count,
        }
    }
}

// ─── seed ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Directory containing chunks.jsonl
    #[arg(long)]
    pub chunks_dir: String,

    /// Directory containing qna.yaml
    #[arg(long)]
    pub seed_dir: String,

    #[arg(long, default_value = "output/seed_data.jsonl")]
    pub output: String,

    #[arg(long, default_value = DEFAULT_TOKENIZER)]
    pub tokenizer: String,

    /// Any chunk over this many tokens is an error
    #[arg(long, default_value_t = DEFAULT_ICL_MAX_TOKENS)]
    pub icl_max_tokens: usize,

    #[arg(long, default_value_t = DEFAULT_ICL_MIN_TOKENS)]
    pub icl_min_tokens: usize,
}

impl From<SeedArgs> for SeedConfig {
    fn from(a: SeedArgs) -> Self {
        SeedConfig {
            chunks_dir:     a.chunks_dir,
            seed_dir:       a.seed_dir,
            output:         a.output,
            tokenizer:      a.tokenizer,
            icl_max_tokens: a.icl_max_tokens,
            icl_min_tokens: a.icl_min_tokens,
        }
    }
}

// ─── select ───────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Path to chunks.jsonl
    #[arg(long)]
    pub chunks_file: String,

    /// Directory for selected_chunks.jsonl
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// Number of chunks to select
    #[arg(long, default_value_t = MIN_SEED_EXAMPLES)]
    pub count: usize,

    /// Random seed for a reproducible selection
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<SelectArgs> for SelectConfig {
    fn from(a: SelectArgs) -> Self {
        SelectConfig {
            chunks_file: a.chunks_file,
            output_dir:  a.output_dir,
            count:       a.count,
            seed:        a.seed,
        }
    }
}

// ─── generate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Contribution name, used for the qagen-<name>.json artifact
    #[arg(long)]
    pub contribution: String,

    /// Path to chunks.jsonl
    #[arg(long)]
    pub chunks_file: String,

    /// Directory for the artifact and qna.yaml
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// OpenAI-compatible base URL, e.g. http://localhost:8000/v1
    #[arg(long)]
    pub api_url: String,

    #[arg(long, env = "QA_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long)]
    pub model_id: String,

    #[arg(long)]
    pub domain: String,

    /// Contribution summary, written as document_outline
    #[arg(long)]
    pub summary: String,

    /// Stylistic directive for the generated questions
    #[arg(long)]
    pub customization: Option<String>,

    /// Chunks of at most this many characters are skipped
    #[arg(long, default_value_t = DEFAULT_MIN_CHUNK_CHARS)]
    pub min_chunk_chars: usize,

    /// Request timeout in seconds (none by default)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            contribution:    a.contribution,
            chunks_file:     a.chunks_file,
            output_dir:      a.output_dir,
            api_url:         a.api_url,
            api_key:         a.api_key,
            model_id:        a.model_id,
            domain:          a.domain,
            summary:         a.summary,
            customization:   a.customization,
            min_chunk_chars: a.min_chunk_chars,
            timeout_secs:    a.timeout_secs,
        }
    }
}

// ─── review / view ────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Path to qna.yaml
    pub seed_file: String,

    #[arg(long, default_value_t = MIN_SEED_EXAMPLES)]
    pub min_seed_examples: usize,

    #[arg(long, default_value_t = QA_PAIRS_PER_EXAMPLE)]
    pub num_qa_pairs: usize,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Path to qna.yaml
    pub seed_file: String,

    /// Zero-based seed example index
    pub index: usize,
}

// ─── compose ──────────────────────────────────────────────────────────────────
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ShapeArg {
    /// Context sampled through RAFT
    Regular,
    /// Context inlined, every record unmasked
    Pretraining,
}

impl From<ShapeArg> for DatasetShape {
    fn from(s: ShapeArg) -> Self {
        match s {
            ShapeArg::Regular     => DatasetShape::Regular,
            ShapeArg::Pretraining => DatasetShape::Pretraining,
        }
    }
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Generated rows (document, question, response, domain, ...)
    #[arg(long)]
    pub input: String,

    #[arg(long)]
    pub output: String,

    #[arg(long, value_enum, default_value_t = ShapeArg::Regular)]
    pub shape: ShapeArg,

    /// Probability of including the golden document
    #[arg(long, default_value_t = DEFAULT_RAFT_P)]
    pub raft_p: f64,

    #[arg(long, default_value_t = DEFAULT_DOCS_IN_CONTEXT)]
    pub num_docs_in_context: usize,

    /// Leave out the summarization auxiliary records
    #[arg(long)]
    pub no_auxiliary: bool,

    /// Unmask only the first N QA rows of each document
    #[arg(long = "keep-qa-per-doc")]
    pub keep_qa_per_doc: Option<usize>,

    /// Drop the rows masked by --keep-qa-per-doc
    #[arg(long = "filter-non-pretraining", requires = "keep_qa_per_doc")]
    pub filter_non_pretraining: bool,

    /// Prefix inlined documents with their document outline
    #[arg(long)]
    pub keep_document_outline: bool,

    /// Random seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<ComposeArgs> for ComposeConfig {
    fn from(a: ComposeArgs) -> Self {
        ComposeConfig {
            input:               a.input,
            output:              a.output,
            shape:               a.shape.into(),
            raft_p:              a.raft_p,
            num_docs_in_context: a.num_docs_in_context,
            add_auxiliary:       !a.no_auxiliary,
            qa_options:          QaDatasetOptions {
                keep_no_qa_per_doc:      a.keep_qa_per_doc,
                filter_non_pre_training: a.filter_non_pretraining,
                keep_document_outline:   a.keep_document_outline,
                ..Default::default()
            },
            seed:                a.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("knowledge-tuning").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_process_defaults() {
        let Commands::Process(args) = parse(&["process", "--parsed-dir", "docs"]) else {
            panic!("expected process");
        };
        let config = ProcessConfig::from(args);
        assert_eq!(config.max_tokens_per_chunk, 500);
        assert_eq!(config.fuse_threshold_words, 200);
        assert_eq!(config.icl_max_tokens, 1024);
        assert_eq!(config.resplit_ctx_size, 4096);
        assert!(!config.same_page_together);
    }

    #[test]
    fn test_process_needs_an_input() {
        let result = Cli::try_parse_from(["knowledge-tuning", "process"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compose_flags() {
        let Commands::Compose(args) = parse(&[
            "compose", "--input", "in.jsonl", "--output", "out.jsonl",
            "--shape", "pretraining", "--no-auxiliary", "--seed", "3",
        ]) else {
            panic!("expected compose");
        };
        let config = ComposeConfig::from(args);
        assert_eq!(config.shape, DatasetShape::Pretraining);
        assert!(!config.add_auxiliary);
        assert_eq!(config.raft_p, 0.4);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.qa_options, QaDatasetOptions::default());
    }

    #[test]
    fn test_compose_qa_policy_flags() {
        let Commands::Compose(args) = parse(&[
            "compose", "--input", "in.jsonl", "--output", "out.jsonl",
            "--keep-qa-per-doc", "2", "--filter-non-pretraining", "--keep-document-outline",
        ]) else {
            panic!("expected compose");
        };
        let options = ComposeConfig::from(args).qa_options;
        assert_eq!(options.keep_no_qa_per_doc, Some(2));
        assert!(options.filter_non_pre_training);
        assert!(options.keep_document_outline);
    }

    #[test]
    fn test_filter_needs_a_cap() {
        let result = Cli::try_parse_from([
            "knowledge-tuning", "compose", "--input", "i", "--output", "o", "--filter-non-pretraining",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_reads_api_key_flag() {
        let Commands::Generate(args) = parse(&[
            "generate", "--contribution", "c", "--chunks-file", "chunks.jsonl",
            "--api-url", "http://h/v1", "--api-key", "secret", "--model-id", "m",
            "--domain", "d", "--summary", "s",
        ]) else {
            panic!("expected generate");
        };
        let config = GenerateConfig::from(args);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.min_chunk_chars, 100);
        assert!(config.timeout_secs.is_none());
    }
}
