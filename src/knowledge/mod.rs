// ============================================================
// Layer 5 — Knowledge Datasets
// ============================================================
// Turns generated (document, question, response) rows into
// training-ready chat records.
//
//   generated rows
//       │
//       ▼
//   composer       → cleans responses, caps QA per document,
//       │            builds user/assistant message pairs
//       ▼
//   raft           → inlines golden + distractor documents
//       │            (regular shape only)
//       ▼
//   summarization  → auxiliary "summarize this document" rows
//
// Two shapes are produced: `regular` (context sampled through
// RAFT) and `pretraining` (context inlined, every row unmasked).

/// Response cleaning, per-document capping, dataset shapes
pub mod composer;

/// Golden/distractor document sampling
pub mod raft;

/// Summarization auxiliary task
pub mod summarization;
