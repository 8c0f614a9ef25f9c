//! Flat inner-product vector index over L2-normalized embeddings.
//!
//! Exhaustive search, no approximation. Position `i` of the index always
//! corresponds to the `i`-th text passed to [`VectorIndex::build`]. The index
//! is read-only once built; a new run builds a new index.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::embed::EmbeddingCache;
use crate::error::{ResearchError, Result};

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the text in build order
    pub position: usize,

    /// Cosine similarity in `[-1, 1]` (0 for zero vectors)
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dim: usize,
    /// Row-major normalized vectors, `len() * dim` floats
    vectors: Vec<f32>,
    texts: Vec<String>,
}

impl VectorIndex {
    /// Embed every text through the cache and index the results.
    ///
    /// Up to `concurrency` embeddings are requested at once; positions keep
    /// input order regardless of completion order.
    pub async fn build(
        cache: &EmbeddingCache,
        texts: Vec<String>,
        concurrency: usize,
    ) -> Result<Self> {
        let vectors: Vec<Vec<f32>> = stream::iter(texts.iter())
            .map(|text| cache.get_vector(text))
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        let index = Self::from_vectors(texts, vectors)?;
        debug!(texts = index.len(), dim = index.dim, "Vector index built");
        Ok(index)
    }

    /// Index precomputed vectors. Every vector must have the same length.
    pub fn from_vectors(texts: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if texts.len() != vectors.len() {
            return Err(ResearchError::Embedding(format!(
                "{} texts but {} vectors",
                texts.len(),
                vectors.len()
            )));
        }

        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(dim * vectors.len());
        for vector in &vectors {
            if vector.len() != dim {
                return Err(ResearchError::DimensionMismatch {
                    expected: dim,
                    found: vector.len(),
                });
            }
            flat.extend(normalized(vector));
        }

        Ok(Self {
            dim,
            vectors: flat,
            texts,
        })
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn text(&self, position: usize) -> Option<&str> {
        self.texts.get(position).map(String::as_str)
    }

    /// The normalized vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dim;
        Some(&self.vectors[start..start + self.dim])
    }

    /// The `k` nearest neighbors of `query` by descending similarity.
    ///
    /// `k` is clamped to the index size. Equal scores keep ascending position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(ResearchError::DimensionMismatch {
                expected: self.dim,
                found: query.len(),
            });
        }

        let query = normalized(query);
        let mut scored: Vec<Neighbor> = (0..self.len())
            .map(|position| {
                let row = &self.vectors[position * self.dim..(position + 1) * self.dim];
                Neighbor {
                    position,
                    score: dot(row, &query),
                }
            })
            .collect();

        // Stable sort: ties stay in position order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k.min(self.len()));
        Ok(scored)
    }

    /// Embed `text` through the cache and search for it.
    pub async fn query(
        &self,
        cache: &EmbeddingCache,
        text: &str,
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let vector = cache.get_vector(text).await?;
        self.search(&vector, k)
    }
}

/// L2-normalize; zero vectors stay zero.
fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
