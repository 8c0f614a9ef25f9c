//! Content-addressed embedding cache.
//!
//! Maps the SHA-256 of the exact text to its vector so repeated texts never
//! hit the embedding service twice (on a warm cache). The cache is pure
//! memoization: disabling it, or a failing store, only costs extra embedding
//! calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::{ai::Embedder, store::EmbeddingStore};
use crate::types::embedding::ContentHash;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Embedding cache over an [`EmbeddingStore`] and an [`Embedder`].
///
/// Safe for concurrent callers. Two concurrent misses for the same text may
/// both call the embedder; the last write wins.
pub struct EmbeddingCache {
    store: Arc<dyn EmbeddingStore>,
    embedder: Arc<dyn Embedder>,
    enabled: bool,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn EmbeddingStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            enabled: true,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Enable or bypass the store.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Embedding for `text`, from the store when present.
    pub async fn get_vector(&self, text: &str) -> Result<Vec<f32>> {
        if !self.enabled {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return self.embedder.embed(text).await;
        }

        let hash = ContentHash::of(text);
        match self.store.get_embedding(&hash).await {
            Ok(Some(vector)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(hash = %hash, "Embedding cache hit");
                return Ok(vector);
            }
            Ok(None) => {}
            Err(e) => warn!(hash = %hash, error = %e, "Embedding cache read failed"),
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let vector = self.embedder.embed(text).await?;

        if let Err(e) = self.store.store_embedding(&hash, &vector).await {
            warn!(hash = %hash, error = %e, "Embedding cache write failed");
        }
        debug!(hash = %hash, dim = vector.len(), "Embedding cache miss stored");
        Ok(vector)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Close the underlying store.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::MockEmbedder;

    fn cache_with(embedder: Arc<MockEmbedder>) -> EmbeddingCache {
        EmbeddingCache::new(Arc::new(MemoryStore::new()), embedder)
    }

    #[tokio::test]
    async fn test_warm_cache_skips_embedder() {
        let embedder = Arc::new(MockEmbedder::new());
        let cache = cache_with(embedder.clone());

        let first = cache.get_vector("tidal energy").await.unwrap();
        let second = cache.get_vector("tidal energy").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(embedder.call_count(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_distinct_texts_are_distinct_keys() {
        let embedder = Arc::new(MockEmbedder::new());
        let cache = cache_with(embedder.clone());

        cache.get_vector("tidal energy").await.unwrap();
        cache.get_vector("tidal energy ").await.unwrap();

        assert_eq!(embedder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_embeds() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = Arc::new(MemoryStore::new());
        let cache = EmbeddingCache::new(store.clone(), embedder.clone()).with_enabled(false);

        let a = cache.get_vector("wind").await.unwrap();
        let b = cache.get_vector("wind").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(embedder.call_count(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_preloaded_store_is_used() {
        let store = Arc::new(MemoryStore::new());
        store
            .store_embedding(&ContentHash::of("geothermal"), &[9.0, 9.0])
            .await
            .unwrap();
        let embedder = Arc::new(MockEmbedder::new());
        let cache = EmbeddingCache::new(store, embedder.clone());

        assert_eq!(cache.get_vector("geothermal").await.unwrap(), vec![9.0, 9.0]);
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_embedder_error_propagates() {
        let embedder = Arc::new(MockEmbedder::new().failing_on("bad"));
        let cache = cache_with(embedder);

        assert!(cache.get_vector("bad").await.is_err());
    }
}
