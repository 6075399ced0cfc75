//! Similarity retrieval against a single source's index.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ScoredChunk, VectorIndex};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Embeds questions and fetches the most similar chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the number of chunks to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `top_k` chunks, most similar first.
    ///
    /// An empty index yields no chunks and the query is not embedded.
    #[instrument(skip(self, index), fields(source_id = %index.source_id(), k = self.top_k))]
    pub async fn retrieve(&self, index: &dyn VectorIndex, query: &str) -> Result<Vec<ScoredChunk>> {
        if index.is_empty() {
            debug!("Index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = index.search(&query_embedding, self.top_k)?;

        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextSplitter;
    use crate::embedding::HashingEmbedder;
    use crate::vector_store::{IndexBuilder, MemoryIndex};

    #[tokio::test]
    async fn test_retrieves_most_relevant_first() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(256));
        let builder = IndexBuilder::new(embedder.clone(), TextSplitter::new(100, 0));
        let text = "Photosynthesis turns sunlight into chemical energy in plants.\n\n\
                    The stock market closed higher on Friday after strong earnings.\n\n\
                    Volcanoes erupt when magma pressure builds beneath the crust.";
        let index = builder.build("abc123", text).await.unwrap();

        let retriever = Retriever::new(embedder).with_top_k(2);
        let results = retriever
            .retrieve(index.as_ref(), "how do plants use sunlight energy")
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].chunk.text.contains("Photosynthesis"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_caps_at_top_k() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
        let builder = IndexBuilder::new(embedder.clone(), TextSplitter::new(30, 5));
        let index = builder
            .build("long", &"talking about many things at length ".repeat(20))
            .await
            .unwrap();
        assert!(index.len() > DEFAULT_TOP_K);

        let retriever = Retriever::new(embedder);
        let results = retriever.retrieve(index.as_ref(), "things").await.unwrap();
        assert_eq!(results.len(), DEFAULT_TOP_K);
    }

    #[tokio::test]
    async fn test_empty_index_yields_nothing() {
        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(8)));
        let index = MemoryIndex::new("empty", 8);
        assert!(retriever.retrieve(&index, "anything").await.unwrap().is_empty());
    }
}
