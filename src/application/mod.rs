// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per pipeline step. Each owns a serialisable
// config and coordinates the data, knowledge and infra layers:
//
//   process  — parsed documents → chunks → ICL records
//   seed     — chunks.jsonl + qna.yaml → seed dataset
//   select   — random chunk sample for hand-written seeds
//   generate — chunks → QA artifact → qna.yaml
//   review   — seed file diagnostics and example viewer
//   compose  — generated rows → training dataset
//
// Rules for this layer:
//   - No printing here (that's Layer 1)
//   - No parsing or file formats (that's Layer 4)
//   - Only workflow coordination

use rand::rngs::StdRng;
use rand::SeedableRng;

pub mod process_use_case;

pub mod seed_use_case;

pub mod generate_use_case;

pub mod review_use_case;

pub mod compose_use_case;

/// Deterministic RNG when a seed is given, entropy otherwise.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    }
}
