// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and ICL-expanded records:
//
//   parsed-document JSON / markdown
//       │
//       ▼
//   loader        → reads documents, chunk stores, qna.yaml
//       │
//       ▼
//   chunker       → groups rendered elements into token-bounded
//       │           chunks (page / break-rule / budget aware)
//       ▼
//   fuser         → merges short chunks into the previous one
//       │
//       ▼
//   icl           → crosses chunks with seed examples, handles
//       │           oversized chunks, drops tiny ones
//       ▼
//   dataset       → JSONL read / write
//
// preprocessor and splitter are shared helpers: heading and
// table rendering, and recursive markdown splitting for chunks
// that are too large for the generator's context.

/// Parsed documents, markdown, chunk stores, seed files
pub mod loader;

/// Heading decoration, table rendering, table tidying
pub mod preprocessor;

/// Token-bounded chunk accumulation
pub mod chunker;

/// Short-chunk fusing
pub mod fuser;

/// Recursive markdown splitting
pub mod splitter;

/// ICL example attachment
pub mod icl;

/// JSONL datasets
pub mod dataset;
