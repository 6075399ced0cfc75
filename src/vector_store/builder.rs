//! Index construction from transcript text.

use super::{MemoryIndex, VectorIndex};
use crate::chunking::TextSplitter;
use crate::embedding::Embedder;
use crate::error::{Result, SporError};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Chunks a transcript, embeds the chunks and builds a [`MemoryIndex`].
#[derive(Clone)]
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, splitter: TextSplitter) -> Self {
        Self { embedder, splitter }
    }

    /// Build an index for `source_id` from its transcript.
    ///
    /// A blank transcript produces an empty index without calling the embedder.
    #[instrument(skip(self, text), fields(source_id = %source_id, chars = text.len()))]
    pub async fn build(&self, source_id: &str, text: &str) -> Result<Arc<dyn VectorIndex>> {
        let chunks = self.splitter.split(text);
        let mut index = MemoryIndex::new(source_id, self.embedder.dimensions());

        if chunks.is_empty() {
            info!("Transcript for {} produced no chunks, index is empty", source_id);
            return Ok(Arc::new(index));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(SporError::Index(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.insert(chunk, embedding)?;
        }

        debug!("Indexed {} chunks for {}", index.len(), source_id);
        Ok(Arc::new(index))
    }
}
