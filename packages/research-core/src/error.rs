//! Typed errors for the research pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Per-URL crawl failures are recovered inside the crawl orchestrator and
//! never reach callers of [`crate::Researcher`]; only the aggregate
//! [`ResearchError::NoPages`] condition does. Dangling citations are not
//! errors at all, see [`crate::pipeline::grounding::DanglingCitations`].

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a research run.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Crawl operation failed
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    /// Crawling and fallback extraction produced zero usable pages
    #[error("no pages scraped")]
    NoPages,

    /// Section generation failed (not retried)
    #[error("generation error: {0}")]
    Generation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Research planning failed
    #[error("planning error: {0}")]
    Planning(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Web search failed
    #[error("search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vectors of different lengths were mixed in one index
    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// The blocking entry point could not start an async runtime
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Errors that can occur while crawling or extracting a single URL.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Network failure while fetching a page directly
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Direct fetch returned a non-2xx status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// The crawling service reported the job as failed
    #[error("crawl job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    /// Polling exceeded its deadline or attempt budget
    #[error("timeout waiting for {target} after {attempts} polls ({elapsed:?})")]
    Timeout {
        target: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// The crawl job completed without any usable page
    #[error("crawl returned no pages for {url}")]
    EmptyResult { url: String },

    /// HTTP request to a service failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl CrawlError {
    /// Build an `Http` error from a plain message.
    pub fn http(message: impl Into<String>) -> Self {
        CrawlError::Http(message.into().into())
    }

    /// Whether this error came from the polling deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlError::Timeout { .. })
    }
}

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A count or size that must be positive was zero
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    /// Two related settings are inconsistent
    #[error("{field} ({value}) must not exceed {limit_field} ({limit})")]
    Exceeds {
        field: &'static str,
        value: usize,
        limit_field: &'static str,
        limit: usize,
    },

    /// A required collaborator or setting was not provided
    #[error("missing {0}")]
    Missing(&'static str),
}

/// Result type alias for research operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
