// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. `clap` parses the
// arguments; every subcommand converts its args into a use-case
// config and hands off to Layer 2. Printing happens only here.
//
//   process  → ProcessUseCase
//   seed     → SeedUseCase
//   select   → save_random_chunk_selection
//   generate → GenerateUseCase
//   review   → review_seed_file
//   view     → view_seed_example
//   compose  → ComposeUseCase

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use commands::{Commands, ReviewArgs, ViewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "knowledge-tuning",
    version,
    about = "Chunk documents, generate QA pairs, and compose knowledge-tuning datasets."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Process(args) => {
                use crate::application::process_use_case::ProcessUseCase;

                let report = ProcessUseCase::new(args.into()).execute()?;
                println!(
                    "Processed {} document(s) into {} chunk(s) and {} ICL record(s).",
                    report.documents, report.chunks, report.records
                );
            }
            Commands::Seed(args) => {
                use crate::application::seed_use_case::SeedUseCase;

                let count = SeedUseCase::new(args.into()).execute()?;
                println!("Wrote {count} seed record(s).");
            }
            Commands::Select(args) => {
                use crate::application::seed_use_case::save_random_chunk_selection;

                let path = save_random_chunk_selection(&args.into())?;
                println!("Selected chunks written to {}", path.display());
            }
            Commands::Generate(args) => {
                use crate::application::generate_use_case::GenerateUseCase;

                let contribution = args.contribution.clone();
                let (status, qna) = GenerateUseCase::new(args.into()).execute()?;
                println!("Status for Q&A generation for {contribution} is: {status}");
                println!("Seed examples written to {}", qna.display());
            }
            Commands::Review(args) => run_review(args)?,
            Commands::View(args)   => run_view(args)?,
            Commands::Compose(args) => {
                use crate::application::compose_use_case::ComposeUseCase;

                let count = ComposeUseCase::new(args.into()).execute()?;
                println!("Wrote {count} training record(s).");
            }
        }
        Ok(())
    }
}

fn run_review(args: ReviewArgs) -> Result<()> {
    use crate::application::review_use_case::review_seed_file;

    let path   = Path::new(&args.seed_file);
    let review = review_seed_file(path, args.min_seed_examples, args.num_qa_pairs)?;

    for note in &review.notes {
        println!("{note}...");
    }
    if review.is_valid() {
        println!("Seed examples file {} is valid", path.display());
    } else {
        println!("\n\x1b[31mERROR! Seed examples validation failed with the following issues:\x1b[0m");
        for err in &review.errors {
            println!("- {err}");
        }
    }
    Ok(())
}

fn run_view(args: ViewArgs) -> Result<()> {
    use crate::application::review_use_case::view_seed_example;

    let example = view_seed_example(Path::new(&args.seed_file), args.index)?;
    println!("Context:\n{}\n", example.context);
    for qa in &example.questions_and_answers {
        println!("Question: {}", qa.question);
        println!("Answer: {}\n", qa.answer);
    }
    Ok(())
}
