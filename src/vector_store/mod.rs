//! Per-source vector indexes and the process-wide index cache.
//!
//! An index is built once from the ordered chunks of one transcript and never
//! mutated afterwards. The [`IndexCache`] owns every built index.

mod builder;
mod cache;
mod memory;

pub use builder::IndexBuilder;
pub use cache::IndexCache;
pub use memory::MemoryIndex;

use crate::chunking::Chunk;
use crate::error::Result;
use serde::Serialize;

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for similarity-searchable indexes over one source's chunks.
pub trait VectorIndex: Send + Sync {
    /// Source this index was built from.
    fn source_id(&self) -> &str;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimensions this index accepts.
    fn dimensions(&self) -> usize;

    /// Return up to `limit` chunks ranked by descending similarity to `query`.
    ///
    /// An empty index yields an empty result, never an error.
    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
