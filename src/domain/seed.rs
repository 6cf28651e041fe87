// ============================================================
// Layer 3 — Seed Examples and ICL Records
// ============================================================
// A seed-examples file (qna.yaml) holds human-curated exemplars:
//
//   document_outline: <contribution summary>
//   domain: <domain>
//   seed_examples:
//     - context: <passage>
//       questions_and_answers:
//         - {question: ..., answer: ...}   × 3
//
// RawSeedFile mirrors the YAML loosely so a reviewer can report
// every problem at once; SeedFile is the validated form the
// pipeline consumes.

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;
use crate::domain::qa_pair::QaPair;

/// QA pairs every seed example must carry.
pub const QA_PAIRS_PER_EXAMPLE: usize = 3;

/// Fewest seed examples the review accepts.
pub const MIN_SEED_EXAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedExample {
    pub context: String,

    #[serde(default)]
    pub questions_and_answers: Vec<QaPair>,
}

/// A validated seed-examples file. Field order matches the
/// order in which the file is written back out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFile {
    pub seed_examples:    Vec<SeedExample>,
    pub document_outline: String,
    pub domain:           String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSeedExample {
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub questions_and_answers: Option<Vec<QaPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSeedFile {
    #[serde(default)]
    pub document_outline: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub seed_examples: Option<Vec<RawSeedExample>>,
}

impl TryFrom<RawSeedFile> for SeedFile {
    type Error = PipelineError;

    fn try_from(raw: RawSeedFile) -> Result<Self, Self::Error> {
        let (Some(document_outline), Some(domain), Some(examples)) =
            (raw.document_outline, raw.domain, raw.seed_examples)
        else {
            return Err(PipelineError::InvalidSeedFile {
                reason: "qna.yaml file is missing document_outline, domain, or seed_examples fields"
                    .to_string(),
            });
        };

        let seed_examples = examples
            .into_iter()
            .enumerate()
            .map(|(i, ex)| {
                let context = ex.context.ok_or_else(|| PipelineError::InvalidSeedExample {
                    index:  i + 1,
                    reason: "missing 'context'".to_string(),
                })?;
                Ok(SeedExample {
                    context,
                    questions_and_answers: ex.questions_and_answers.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(SeedFile {
            seed_examples,
            document_outline,
            domain,
        })
    }
}

// ─── Review ───────────────────────────────────────────────────────────────────
/// Outcome of reviewing a seed-examples file: progress notes for the
/// checks that passed and human-readable errors for the ones that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReview {
    pub notes:  Vec<String>,
    pub errors: Vec<String>,
}

impl SeedReview {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl RawSeedFile {
    pub fn review(&self, min_seed_examples: usize, num_qa_pairs: usize) -> SeedReview {
        let mut review = SeedReview::default();

        match self.document_outline {
            Some(_) => review.notes.push("Found contribution summary".to_string()),
            None => review
                .errors
                .push("Missing contribution summary in 'document_outline'".to_string()),
        }

        match self.domain {
            Some(_) => review.notes.push("Found 'domain'".to_string()),
            None => review.errors.push("Missing 'domain'".to_string()),
        }

        let examples = self.seed_examples.as_deref().unwrap_or_default();
        if examples.is_empty() {
            review
                .errors
                .push("'seed_examples' section is missing or empty.".to_string());
        } else if examples.len() < min_seed_examples {
            review.errors.push(format!(
                "'seed_examples' should contain at least {min_seed_examples} examples, found {}. \
                 Please add {} more seed example(s)",
                examples.len(),
                min_seed_examples - examples.len()
            ));
        } else {
            review.notes.push(format!(
                "Found {} 'contexts' in 'seed_examples'. Minimum expected number is {min_seed_examples}",
                examples.len()
            ));
        }

        for (i, example) in examples.iter().enumerate() {
            let n = i + 1;
            match example.questions_and_answers.as_deref() {
                None | Some([]) => review
                    .errors
                    .push(format!("Seed Example {n} is missing 'questions_and_answers' section.")),
                Some(pairs) if pairs.len() != num_qa_pairs => review.errors.push(format!(
                    "Seed Example {n} should contain {num_qa_pairs} question-answer pairs, found {}. \
                     Please add {} more question-answer pair(s) to seed example {n}",
                    pairs.len(),
                    num_qa_pairs as isize - pairs.len() as isize
                )),
                Some(_) => review.notes.push(format!(
                    "Seed Example {n} contains expected number ({num_qa_pairs}) of 'questions_and_answers'"
                )),
            }
        }

        review
    }
}

// ─── ICL records ──────────────────────────────────────────────────────────────
/// A chunk expanded with one seed example's context and its three
/// QA pairs. Field names are the ones the generation pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IclRecord {
    pub document:         String,
    pub document_outline: String,
    pub document_title:   String,
    pub domain:           String,
    pub icl_document:     String,
    pub icl_query_1:      String,
    pub icl_response_1:   String,
    pub icl_query_2:      String,
    pub icl_response_2:   String,
    pub icl_query_3:      String,
    pub icl_response_3:   String,
}
