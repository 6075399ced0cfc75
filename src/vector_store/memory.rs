//! In-memory flat vector index.
//!
//! Scores every chunk by cosine similarity with a linear scan.

use super::{cosine_similarity, ScoredChunk, VectorIndex};
use crate::chunking::Chunk;
use crate::error::{Result, SporError};

/// In-memory index for one source.
#[derive(Debug)]
pub struct MemoryIndex {
    source_id: String,
    dimensions: usize,
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new(source_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            source_id: source_id.into(),
            dimensions,
            entries: Vec::new(),
        }
    }

    /// Add a chunk with its embedding.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(SporError::Index(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }
        self.entries.push((chunk, embedding));
        Ok(())
    }
}

impl VectorIndex for MemoryIndex {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if self.entries.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(SporError::Index(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions,
                query.len()
            )));
        }

        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query, embedding),
            })
            .collect();

        // Stable sort: equal scores keep transcript order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }
}
