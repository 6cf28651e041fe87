// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Adapters for the two external capabilities the pipeline
// consumes through domain traits:
//
//   tokenizer_store.rs — TokenCounter implementations
//                        A HuggingFace tokenizer loaded from a
//                        local tokenizer.json or the Hub, plus a
//                        word-count estimate for offline runs.
//
//   qa_service.rs      — QaGenerator implementation
//                        Posts chunks to an OpenAI-compatible
//                        chat-completions endpoint and appends
//                        the parsed QA pairs to the artifact.

/// Token counting (HuggingFace tokenizers or word heuristic)
pub mod tokenizer_store;

/// OpenAI-compatible QA generation client
pub mod qa_service;
