//! Bounded-concurrency crawl with job polling and direct-fetch fallback.
//!
//! Every URL goes through the same two-step strategy:
//!
//! 1. Submit a job to the [`CrawlService`] and poll it under the configured
//!    [`PollPolicy`](super::poll::PollPolicy).
//! 2. On any failure of step 1 (submit error, failed job, timeout, or a job
//!    that completed without usable pages) fetch the URL directly through
//!    the [`PageFetcher`].
//!
//! A URL that fails both steps contributes nothing and is not retried. One
//! URL's failure never affects the others.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::poll::PollState;
use crate::error::{CrawlError, CrawlResult};
use crate::traits::crawl_service::{CrawlService, JobStatus};
use crate::traits::fetcher::PageFetcher;
use crate::types::config::CrawlConfig;
use crate::types::page::Page;

/// Which path produced a URL's result.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlVia {
    /// The crawling service returned one or more pages
    Service(Vec<Page>),

    /// The service path failed and the direct fetch succeeded
    Fallback(Page),

    /// Both paths failed
    Failed(String),
}

/// Result of crawling one input URL.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOutcome {
    pub url: String,

    /// Position of the URL in the input list
    pub position: usize,

    pub via: CrawlVia,
}

impl CrawlOutcome {
    /// Pages produced for this URL, in service order.
    pub fn pages(&self) -> &[Page] {
        match &self.via {
            CrawlVia::Service(pages) => pages,
            CrawlVia::Fallback(page) => std::slice::from_ref(page),
            CrawlVia::Failed(_) => &[],
        }
    }
}

/// Per-run crawl counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Input URLs
    pub urls: usize,

    /// URLs served by the crawling service
    pub via_service: usize,

    /// URLs served by the direct fetch
    pub via_fallback: usize,

    /// URLs that produced nothing
    pub failed: usize,

    /// Total pages across all URLs
    pub pages: usize,
}

impl CrawlStats {
    pub fn from_outcomes(outcomes: &[CrawlOutcome]) -> Self {
        let mut stats = CrawlStats {
            urls: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match &outcome.via {
                CrawlVia::Service(_) => stats.via_service += 1,
                CrawlVia::Fallback(_) => stats.via_fallback += 1,
                CrawlVia::Failed(_) => stats.failed += 1,
            }
            stats.pages += outcome.pages().len();
        }
        stats
    }

    /// URLs that produced at least one page.
    pub fn succeeded(&self) -> usize {
        self.via_service + self.via_fallback
    }
}

/// Crawl orchestrator.
///
/// # Example
///
/// ```rust,ignore
/// use research_core::crawlers::CrawlOrchestrator;
///
/// let orchestrator = CrawlOrchestrator::new(service, fetcher, CrawlConfig::default());
/// let pages = orchestrator.crawl_urls(&urls).await;
/// ```
pub struct CrawlOrchestrator {
    service: Arc<dyn CrawlService>,
    fetcher: Arc<dyn PageFetcher>,
    config: CrawlConfig,
}

impl CrawlOrchestrator {
    pub fn new(
        service: Arc<dyn CrawlService>,
        fetcher: Arc<dyn PageFetcher>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            service,
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl every URL and return all pages.
    ///
    /// Pages are ordered by input URL position, then by the order the
    /// service returned them. Never fails; an empty result is the caller's
    /// call to make.
    pub async fn crawl_urls(&self, urls: &[String]) -> Vec<Page> {
        self.crawl_detailed(urls)
            .await
            .into_iter()
            .flat_map(|outcome| match outcome.via {
                CrawlVia::Service(pages) => pages,
                CrawlVia::Fallback(page) => vec![page],
                CrawlVia::Failed(_) => Vec::new(),
            })
            .collect()
    }

    /// Crawl every URL and report which path served each one.
    ///
    /// Outcomes are sorted by input position.
    pub async fn crawl_detailed(&self, urls: &[String]) -> Vec<CrawlOutcome> {
        if urls.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let total = urls.len();
        info!(
            urls = total,
            concurrency = self.config.concurrency,
            limit_per_url = self.config.limit_per_url,
            "Crawl starting"
        );

        let semaphore = Semaphore::new(self.config.concurrency.max(1));
        let mut in_flight: FuturesUnordered<_> = urls
            .iter()
            .enumerate()
            .map(|(position, url)| {
                let semaphore = &semaphore;
                async move {
                    let via = match semaphore.acquire().await {
                        // The permit covers the service attempt and the fallback
                        Ok(_permit) => self.crawl_one(url).await,
                        Err(e) => CrawlVia::Failed(e.to_string()),
                    };
                    CrawlOutcome {
                        url: url.clone(),
                        position,
                        via,
                    }
                }
            })
            .collect();

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = in_flight.next().await {
            debug!(
                url = %outcome.url,
                pages = outcome.pages().len(),
                done = outcomes.len() + 1,
                total,
                "URL finished"
            );
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.position);

        let stats = CrawlStats::from_outcomes(&outcomes);
        info!(
            urls = stats.urls,
            via_service = stats.via_service,
            via_fallback = stats.via_fallback,
            failed = stats.failed,
            pages = stats.pages,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Crawl completed"
        );

        outcomes
    }

    /// Service path first, direct fetch second.
    async fn crawl_one(&self, url: &str) -> CrawlVia {
        let service_error = match self.via_service(url).await {
            Ok(pages) => return CrawlVia::Service(pages),
            Err(e) => e,
        };

        warn!(url = %url, error = %service_error, "Crawl service failed, falling back to direct fetch");

        match self.fetcher.fetch(url, self.config.fallback_timeout).await {
            Ok(page) => CrawlVia::Fallback(page.truncated(self.config.max_page_chars)),
            Err(fetch_error) => {
                warn!(url = %url, error = %fetch_error, "Fallback fetch failed, skipping URL");
                CrawlVia::Failed(format!(
                    "service: {}; fallback: {}",
                    service_error, fetch_error
                ))
            }
        }
    }

    /// Submit and poll under one deadline, measured from the submit.
    async fn via_service(&self, url: &str) -> CrawlResult<Vec<Page>> {
        let poll = self.config.poll;
        let start = tokio::time::Instant::now();
        let job = poll
            .within(start, url, self.service.submit(url, self.config.limit_per_url))
            .await?;
        debug!(url = %url, job_id = %job, "Polling crawl job");

        let service = &self.service;
        let job_ref = &job;
        let pages = poll
            .run_since(start, job.as_str(), |_| async move {
                match service.status(job_ref).await? {
                    JobStatus::Pending => Ok(PollState::Pending),
                    JobStatus::Completed(pages) => Ok(PollState::Ready(pages)),
                    JobStatus::Failed(reason) => Err(CrawlError::JobFailed {
                        job_id: job_ref.to_string(),
                        reason: reason.unwrap_or_else(|| "unknown".to_string()),
                    }),
                }
            })
            .await?;

        let pages: Vec<Page> = pages
            .into_iter()
            .filter(Page::has_content)
            .map(|page| page.truncated(self.config.max_page_chars))
            .collect();

        if pages.is_empty() {
            return Err(CrawlError::EmptyResult {
                url: url.to_string(),
            });
        }
        Ok(pages)
    }
}
