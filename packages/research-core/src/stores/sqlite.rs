//! SQLite embedding store.
//!
//! A file-based backend that survives process restarts. Vectors are stored
//! as little-endian `f32` blobs keyed by the hex content hash.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::debug;

use crate::error::{ResearchError, Result};
use crate::traits::store::EmbeddingStore;
use crate::types::embedding::{vector_from_bytes, vector_to_bytes, ContentHash};

/// SQLite-based embedding store.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn storage_error(e: sqlx::Error) -> ResearchError {
    ResearchError::Storage(Box::new(e))
}

impl SqliteStore {
    /// Open (creating if needed) a store at the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://embed_cache.sqlite` - File-based database
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_error)?
            .create_if_missing(true);

        // A single connection keeps `sqlite::memory:` one shared database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        let store = Self { pool };
        store.run_migrations().await?;
        debug!(url = %database_url, "Embedding store opened");
        Ok(store)
    }

    /// Open a store backed by a file path.
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::new(&format!("sqlite://{}", path.as_ref().display())).await
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                hash TEXT PRIMARY KEY,
                vector BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    async fn get_embedding(&self, hash: &ContentHash) -> Result<Option<Vec<f32>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT vector FROM embeddings WHERE hash = ?")
            .bind(hash.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(|(bytes,)| vector_from_bytes(&bytes)))
    }

    async fn store_embedding(&self, hash: &ContentHash, vector: &[f32]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO embeddings (hash, vector)
            VALUES (?, ?)
            ON CONFLICT(hash) DO UPDATE SET
                vector = excluded.vector
            "#,
        )
        .bind(hash.as_str())
        .bind(vector_to_bytes(vector))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count.max(0) as usize)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
