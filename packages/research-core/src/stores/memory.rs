//! In-memory embedding store for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ResearchError, Result};
use crate::traits::store::EmbeddingStore;
use crate::types::embedding::ContentHash;

/// In-memory storage for embeddings.
///
/// Not suitable for production as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    embeddings: RwLock<HashMap<ContentHash, Vec<f32>>>,
}

fn poisoned<E>(_: E) -> ResearchError {
    ResearchError::Storage("memory store lock poisoned".into())
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) -> Result<()> {
        self.embeddings.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn get_embedding(&self, hash: &ContentHash) -> Result<Option<Vec<f32>>> {
        Ok(self.embeddings.read().map_err(poisoned)?.get(hash).cloned())
    }

    async fn store_embedding(&self, hash: &ContentHash, vector: &[f32]) -> Result<()> {
        self.embeddings
            .write()
            .map_err(poisoned)?
            .insert(hash.clone(), vector.to_vec());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.embeddings.read().map_err(poisoned)?.len())
    }
}
