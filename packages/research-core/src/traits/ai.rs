//! Language-model collaborators: embeddings, section prose, and planning.
//!
//! The core treats all three as opaque functions. Prompting and response
//! parsing belong to the implementation (see `ai::OpenAI`).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::report::{ResearchPlan, Snippet};

/// Embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for text.
    ///
    /// Every call for one index must return vectors of the same length.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Generation service for one report section.
#[async_trait]
pub trait SectionWriter: Send + Sync {
    /// Write the body of `title` from numbered snippets.
    ///
    /// Citations in the returned prose use the snippet numbers. Failures are
    /// not retried by the pipeline and abort the run.
    async fn write_section(&self, title: &str, snippets: &[Snippet]) -> Result<String>;
}

/// Research planner: outline and search keywords for a question.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, question: &str) -> Result<ResearchPlan>;
}
