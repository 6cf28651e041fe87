// ============================================================
// Layer 4 — Chunk Fuser
// ============================================================
// Short chunks (≤ threshold words) are noise on their own; they
// are appended as a new paragraph to the chunk before them.
// The first chunk has nothing to merge into and always stands.
//
// Example with threshold = 3:
//   ["a b c d e", "f g", "h i j k l"] → ["a b c d e\n\nf g", "h i j k l"]

/// Default word threshold below which a chunk is fused.
pub const DEFAULT_FUSE_THRESHOLD_WORDS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct ChunkFuser {
    short_threshold_words: usize,
}

impl Default for ChunkFuser {
    fn default() -> Self {
        Self::new(DEFAULT_FUSE_THRESHOLD_WORDS)
    }
}

impl ChunkFuser {
    pub fn new(short_threshold_words: usize) -> Self {
        Self { short_threshold_words }
    }

    pub fn fuse(&self, chunks: Vec<String>) -> Vec<String> {
        let mut fused: Vec<String> = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let is_short = chunk.split_whitespace().count() <= self.short_threshold_words;
            match fused.last_mut() {
                Some(previous) if is_short => {
                    previous.push_str("\n\n");
                    previous.push_str(&chunk);
                }
                _ => fused.push(chunk),
            }
        }

        tracing::debug!("Fused into {} chunks", fused.len());
        fused
    }
}
