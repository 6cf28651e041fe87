// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain structs, enums, and traits describing what flows
// through the knowledge-tuning pipeline:
//
//   DocumentElement → Chunk → IclRecord → QaRecord
//                                  → GeneratedRecord → KnowledgeRecord
//
// Rules for this layer:
//   - NO file I/O or network calls
//   - NO tokenizer or HTTP client types
//   - External capabilities appear only as traits

/// Structural elements of a parsed document
pub mod document;

/// Token-bounded text chunks and chunk-store entries
pub mod chunk;

/// Question/answer pairs and generated QA artifact rows
pub mod qa_pair;

/// Seed-examples file and ICL-expanded records
pub mod seed;

/// Generated rows and final training records
pub mod record;

/// Error taxonomy shared by every layer
pub mod error;

/// Injected capabilities: token counting, chunk breaks, QA generation
pub mod traits;
