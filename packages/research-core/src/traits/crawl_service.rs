//! Asynchronous crawling service (submit a job, then poll it).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CrawlResult;
use crate::types::page::Page;

/// Opaque job identifier issued by the crawling service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a crawl job as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Still running
    Pending,

    /// Finished; pages in the order the service returned them
    Completed(Vec<Page>),

    /// The service gave up on the job
    Failed(Option<String>),
}

/// Job-based crawling service.
#[async_trait]
pub trait CrawlService: Send + Sync {
    /// Submit a crawl of `url` limited to `limit` pages.
    async fn submit(&self, url: &str, limit: usize) -> CrawlResult<JobId>;

    /// Fetch the current status of a job.
    async fn status(&self, job: &JobId) -> CrawlResult<JobStatus>;
}
