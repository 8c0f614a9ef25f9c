//! Direct single-page fetch, used as the crawl fallback.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CrawlResult;
use crate::types::page::Page;

/// Fetches one URL and reduces it to a readable [`Page`].
///
/// Implementations fail with [`crate::CrawlError::Fetch`] or
/// [`crate::CrawlError::HttpStatus`] and never on malformed markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> CrawlResult<Page>;
}
