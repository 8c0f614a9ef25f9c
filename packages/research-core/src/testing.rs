//! Testing utilities including mock implementations.
//!
//! Every boundary trait has a deterministic in-memory mock here so the
//! pipeline can be exercised without network, model, or database access.
//! All mocks record their calls for assertions.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult, ResearchError, Result};
use crate::traits::{
    ai::{Embedder, Planner, SectionWriter},
    crawl_service::{CrawlService, JobId, JobStatus},
    fetcher::PageFetcher,
    searcher::{SearchResult, WebSearcher},
};
use crate::types::page::{Page, PageSource};
use crate::types::report::{ResearchPlan, Snippet};

// Poisoning only happens after a panic in another test thread; keep going.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Tracks how many calls are running at once.
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MockEmbedder
// ============================================================================

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one of `dim` buckets, so texts that
/// share words have positive cosine similarity. Fixed vectors can be set
/// per text.
pub struct MockEmbedder {
    dim: usize,
    fixed: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dim: 16,
            fixed: Default::default(),
            failing: Default::default(),
            calls: Default::default(),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Return `vector` for exactly `text`.
    pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        write(&self.fixed).insert(text.into(), vector);
        self
    }

    /// Fail when asked to embed exactly `text`.
    pub fn failing_on(self, text: impl Into<String>) -> Self {
        write(&self.failing).insert(text.into());
        self
    }

    /// Texts embedded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        read(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        read(&self.calls).len()
    }

    /// The vector this mock produces for `text` (without recording a call).
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = read(&self.fixed).get(text) {
            return vector.clone();
        }
        let mut vector = vec![0.0; self.dim];
        if self.dim == 0 {
            return vector;
        }
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let bucket = u16::from_le_bytes([digest[0], digest[1]]) as usize % self.dim;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        write(&self.calls).push(text.to_string());
        if read(&self.failing).contains(text) {
            return Err(ResearchError::Embedding("mock embedding failure".to_string()));
        }
        Ok(self.vector_for(text))
    }
}

// ============================================================================
// MockCrawlService
// ============================================================================

#[derive(Clone)]
enum JobScript {
    Pages(Vec<Page>),
    Failed,
    Stuck,
    HungSubmit,
    HungStatus,
}

/// Scripted crawling service.
///
/// URLs without a script fail at submit time, like an unreachable service.
#[derive(Default)]
pub struct MockCrawlService {
    scripts: Arc<RwLock<HashMap<String, JobScript>>>,
    jobs: Arc<RwLock<HashMap<String, (String, usize)>>>,
    pending_polls: usize,
    submit_delay: Option<Duration>,
    submitted: Arc<RwLock<Vec<(String, usize)>>>,
    status_calls: AtomicUsize,
    in_flight: InFlight,
}

impl MockCrawlService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose every submit fails.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Complete the job for `url` with `pages`.
    pub fn with_pages(self, url: impl Into<String>, pages: Vec<Page>) -> Self {
        write(&self.scripts).insert(url.into(), JobScript::Pages(pages));
        self
    }

    /// Report the job for `url` as failed.
    pub fn with_failed_job(self, url: impl Into<String>) -> Self {
        write(&self.scripts).insert(url.into(), JobScript::Failed);
        self
    }

    /// Keep the job for `url` pending forever.
    pub fn with_stuck_job(self, url: impl Into<String>) -> Self {
        write(&self.scripts).insert(url.into(), JobScript::Stuck);
        self
    }

    /// Never answer the submit for `url`.
    pub fn with_hung_submit(self, url: impl Into<String>) -> Self {
        write(&self.scripts).insert(url.into(), JobScript::HungSubmit);
        self
    }

    /// Accept the job for `url`, then never answer a status call.
    pub fn with_hung_status(self, url: impl Into<String>) -> Self {
        write(&self.scripts).insert(url.into(), JobScript::HungStatus);
        self
    }

    /// Report every job as pending for the first `polls` status calls.
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Sleep this long inside every submit.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// `(url, limit)` for every submit, in call order.
    pub fn submitted(&self) -> Vec<(String, usize)> {
        read(&self.submitted).clone()
    }

    /// Total status polls across all jobs.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent submits observed.
    pub fn max_in_flight(&self) -> usize {
        self.in_flight.max()
    }
}

#[async_trait]
impl CrawlService for MockCrawlService {
    async fn submit(&self, url: &str, limit: usize) -> CrawlResult<JobId> {
        self.in_flight.enter();
        write(&self.submitted).push((url.to_string(), limit));
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        let script = read(&self.scripts).get(url).cloned();
        match script {
            None => return Err(CrawlError::http(format!("connection refused: {}", url))),
            Some(JobScript::HungSubmit) => return std::future::pending().await,
            Some(_) => {}
        }

        let mut jobs = write(&self.jobs);
        let id = format!("job-{}", jobs.len() + 1);
        jobs.insert(id.clone(), (url.to_string(), 0));
        Ok(JobId::new(id))
    }

    async fn status(&self, job: &JobId) -> CrawlResult<JobStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let (url, polls) = {
            let mut jobs = write(&self.jobs);
            let entry = jobs
                .get_mut(job.as_str())
                .ok_or_else(|| CrawlError::http(format!("unknown job {}", job)))?;
            entry.1 += 1;
            entry.clone()
        };

        let script = read(&self.scripts).get(&url).cloned();
        if let Some(JobScript::HungStatus) = script {
            return std::future::pending().await;
        }

        if polls <= self.pending_polls {
            return Ok(JobStatus::Pending);
        }

        Ok(match script {
            Some(JobScript::Pages(pages)) => JobStatus::Completed(pages),
            Some(JobScript::Failed) => JobStatus::Failed(Some("mock job failure".to_string())),
            Some(JobScript::Stuck | JobScript::HungSubmit | JobScript::HungStatus) | None => {
                JobStatus::Pending
            }
        })
    }
}

// ============================================================================
// MockFetcher
// ============================================================================

/// Scripted direct fetcher. Unknown URLs fail with a network error.
#[derive(Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, (String, String)>>>,
    failures: Arc<RwLock<HashSet<String>>>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<String>>>,
    in_flight: InFlight,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a page for `url`.
    pub fn with_page(
        self,
        url: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        write(&self.pages).insert(url.into(), (title.into(), body.into()));
        self
    }

    /// Answer `url` with HTTP 500.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        write(&self.failures).insert(url.into());
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        read(&self.calls).clone()
    }

    /// Highest number of concurrent fetches observed.
    pub fn max_in_flight(&self) -> usize {
        self.in_flight.max()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> CrawlResult<Page> {
        self.in_flight.enter();
        write(&self.calls).push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        if read(&self.failures).contains(url) {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: 500,
            });
        }

        match read(&self.pages).get(url) {
            Some((title, body)) => Ok(Page::new(
                url,
                title.clone(),
                format!("# {}\n\n{}", title, body),
                PageSource::Fallback,
            )),
            None => Err(CrawlError::Fetch {
                url: url.to_string(),
                reason: "mock connection refused".to_string(),
            }),
        }
    }
}

// ============================================================================
// MockSectionWriter
// ============================================================================

/// Record of one section-writer call.
#[derive(Debug, Clone)]
pub struct MockSectionCall {
    pub title: String,
    pub snippets: Vec<Snippet>,
}

/// Section writer returning canned bodies.
///
/// Unknown titles get `"Findings on <title> [1]."`.
#[derive(Default)]
pub struct MockSectionWriter {
    bodies: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<MockSectionCall>>>,
}

impl MockSectionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `body` for the section titled `title`.
    pub fn with_body(self, title: impl Into<String>, body: impl Into<String>) -> Self {
        write(&self.bodies).insert(title.into(), body.into());
        self
    }

    /// Fail when asked for `title`.
    pub fn failing_on(self, title: impl Into<String>) -> Self {
        write(&self.failing).insert(title.into());
        self
    }

    pub fn calls(&self) -> Vec<MockSectionCall> {
        read(&self.calls).clone()
    }
}

#[async_trait]
impl SectionWriter for MockSectionWriter {
    async fn write_section(&self, title: &str, snippets: &[Snippet]) -> Result<String> {
        write(&self.calls).push(MockSectionCall {
            title: title.to_string(),
            snippets: snippets.to_vec(),
        });

        if read(&self.failing).contains(title) {
            return Err(ResearchError::Generation(
                format!("mock generation failure for {}", title).into(),
            ));
        }

        Ok(read(&self.bodies)
            .get(title)
            .cloned()
            .unwrap_or_else(|| format!("Findings on {} [1].", title)))
    }
}

// ============================================================================
// MockPlanner
// ============================================================================

/// Planner returning a fixed plan.
pub struct MockPlanner {
    plan: ResearchPlan,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockPlanner {
    pub fn new(plan: ResearchPlan) -> Self {
        Self {
            plan,
            calls: Default::default(),
        }
    }

    /// Questions planned so far.
    pub fn calls(&self) -> Vec<String> {
        read(&self.calls).clone()
    }
}

#[async_trait]
impl Planner for MockPlanner {
    async fn plan(&self, question: &str) -> Result<ResearchPlan> {
        write(&self.calls).push(question.to_string());
        Ok(self.plan.clone())
    }
}

// ============================================================================
// MockWebSearcher
// ============================================================================

/// Mock web searcher for testing.
#[derive(Default)]
pub struct MockWebSearcher {
    results: Arc<RwLock<HashMap<String, Vec<SearchResult>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<(String, usize)>>>,
}

impl MockWebSearcher {
    /// Create a new mock searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for a query.
    pub fn with_results(self, query: &str, results: Vec<SearchResult>) -> Self {
        write(&self.results).insert(query.to_string(), results);
        self
    }

    /// Add URL strings as results.
    pub fn with_urls(self, query: &str, urls: &[&str]) -> Self {
        let results: Vec<_> = urls
            .iter()
            .filter_map(|u| SearchResult::from_url(u))
            .collect();
        self.with_results(query, results)
    }

    /// Fail when asked for `query`.
    pub fn failing_on(self, query: &str) -> Self {
        write(&self.failing).insert(query.to_string());
        self
    }

    /// `(query, limit)` for every search, in call order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        read(&self.calls).clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with_limit(query, usize::MAX).await
    }

    async fn search_with_limit(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        write(&self.calls).push((query.to_string(), limit));
        if read(&self.failing).contains(query) {
            return Err(ResearchError::Search(
                format!("mock search failure for {}", query).into(),
            ));
        }
        let mut results = read(&self.results).get(query).cloned().unwrap_or_default();
        results.truncate(limit);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new();
        let a = embedder.embed("solar power storage").await.unwrap();
        let b = embedder.embed("solar power storage").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(a.iter().sum::<f32>(), 3.0);
        assert_eq!(embedder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_crawl_service_pending_then_completed() {
        let url = "https://a.example/";
        let service = MockCrawlService::new()
            .with_pages(url, vec![Page::new(url, "A", "alpha", PageSource::Service)])
            .with_pending_polls(1);

        let job = service.submit(url, 3).await.unwrap();
        assert_eq!(service.status(&job).await.unwrap(), JobStatus::Pending);
        assert!(matches!(
            service.status(&job).await.unwrap(),
            JobStatus::Completed(pages) if pages.len() == 1
        ));
        assert_eq!(service.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_crawl_service_unreachable() {
        let service = MockCrawlService::unreachable();
        assert!(service.submit("https://a.example/", 3).await.is_err());
        assert_eq!(service.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.example/", "A", "alpha")
            .with_failure("https://b.example/");

        let page = fetcher
            .fetch("https://a.example/", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(page.text, "# A\n\nalpha");
        assert!(matches!(
            fetcher.fetch("https://b.example/", Duration::from_secs(1)).await,
            Err(CrawlError::HttpStatus { status: 500, .. })
        ));
        assert!(fetcher
            .fetch("https://c.example/", Duration::from_secs(1))
            .await
            .is_err());
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_web_searcher() {
        let searcher = MockWebSearcher::new().with_urls(
            "battery recycling",
            &["https://a.example/1", "https://b.example/2"],
        );

        let results = searcher.search("battery recycling").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url.as_str(), "https://a.example/1");
        assert!(searcher.search("unknown").await.unwrap().is_empty());
    }
}
