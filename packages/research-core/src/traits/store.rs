//! Persistence for the content-addressed embedding cache.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::embedding::ContentHash;

/// Key-value store mapping a content hash to its embedding.
///
/// Shared process-wide and written concurrently; per-key atomicity is
/// enough. Stores are opened explicitly and should be closed on shutdown.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Get the embedding stored for a hash.
    async fn get_embedding(&self, hash: &ContentHash) -> Result<Option<Vec<f32>>>;

    /// Store an embedding, replacing any previous value for the hash.
    async fn store_embedding(&self, hash: &ContentHash, vector: &[f32]) -> Result<()>;

    /// Number of stored embeddings.
    async fn count(&self) -> Result<usize>;

    /// Release underlying resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
