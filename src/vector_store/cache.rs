//! Process-wide cache of built indexes, keyed by source ID.
//!
//! At most one index exists per source for the life of the cache. Entries are never
//! evicted or invalidated: a transcript is treated as immutable once fetched, so a
//! transcript edited upstream is not picked up until the process restarts. Memory
//! grows with the number of distinct sources queried.
//!
//! Concurrent first requests for the same source share a single [`OnceCell`], so only
//! one fetch and build runs and the others wait for its result. Requests for
//! different sources never wait on each other.

use super::VectorIndex;
use crate::error::Result;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

type Slot = Arc<OnceCell<Arc<dyn VectorIndex>>>;

/// Cache of vector indexes keyed by source ID.
#[derive(Default)]
pub struct IndexCache {
    slots: DashMap<String, Slot>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached index for `source_id`, building it on a miss.
    ///
    /// On a miss `fetch` obtains the transcript and `build` turns it into an index.
    /// If either fails the error is returned and nothing is cached.
    #[instrument(skip(self, fetch, build), fields(source_id = %source_id))]
    pub async fn get_or_build<F, FFut, B, BFut>(
        &self,
        source_id: &str,
        fetch: F,
        build: B,
    ) -> Result<Arc<dyn VectorIndex>>
    where
        F: FnOnce(String) -> FFut,
        FFut: Future<Output = Result<String>>,
        B: FnOnce(String, String) -> BFut,
        BFut: Future<Output = Result<Arc<dyn VectorIndex>>>,
    {
        let slot = self.slot(source_id);

        if let Some(index) = slot.get() {
            debug!("Index cache hit for {}", source_id);
            return Ok(index.clone());
        }

        let id = source_id.to_string();
        let result = slot
            .get_or_try_init(|| async move {
                info!("Index cache miss for {}, building", id);
                let transcript = fetch(id.clone()).await?;
                build(id, transcript).await
            })
            .await;

        match result {
            Ok(index) => Ok(index.clone()),
            Err(e) => {
                warn!("Failed to build index for {}: {}", source_id, e);
                self.slots
                    .remove_if(source_id, |_, slot| !slot.initialized());
                Err(e)
            }
        }
    }

    /// Get an already built index.
    pub fn get(&self, source_id: &str) -> Option<Arc<dyn VectorIndex>> {
        self.slots
            .get(source_id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Whether a built index exists for `source_id`.
    pub fn contains(&self, source_id: &str) -> bool {
        self.get(source_id).is_some()
    }

    /// Number of built indexes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|entry| entry.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source IDs with a built index, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .slots
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    fn slot(&self, source_id: &str) -> Slot {
        self.slots
            .entry(source_id.to_string())
            .or_default()
            .value()
            .clone()
    }
}
