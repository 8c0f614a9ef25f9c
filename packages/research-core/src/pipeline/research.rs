//! The Researcher - main entry point for a research run.
//!
//! One run goes plan → search → crawl → index → write → verify:
//!
//! 1. The [`Planner`] turns the question into a title, an outline and
//!    search keywords.
//! 2. Every keyword fans out to the [`WebSearcher`]; URLs are de-duplicated
//!    preserving first occurrence.
//! 3. The [`CrawlOrchestrator`] crawls the URLs with bounded concurrency and
//!    direct-fetch fallback.
//! 4. The [`RetrievalPipeline`] indexes the pages, writes each section from
//!    its nearest snippets, assembles the document and checks citations.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexSet;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::embed::{CacheStats, EmbeddingCache};
use super::grounding::DanglingCitations;
use super::progress::Progress;
use super::retrieval::RetrievalPipeline;
use crate::crawlers::{CrawlOrchestrator, CrawlStats};
use crate::error::{ConfigError, ResearchError, Result};
use crate::ingestors::HttpExtractor;
use crate::stores::MemoryStore;
use crate::traits::{
    ai::{Embedder, Planner, SectionWriter},
    crawl_service::CrawlService,
    fetcher::PageFetcher,
    searcher::WebSearcher,
    store::EmbeddingStore,
};
use crate::types::{
    config::ResearchConfig,
    page::Page,
    report::{ReportDocument, ResearchPlan},
};

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub run_id: Uuid,
    pub question: String,
    pub plan: ResearchPlan,

    /// De-duplicated search results, in crawl order
    pub urls: Vec<String>,

    /// Crawled pages; page `i` is bibliography entry `[i + 1]`
    pub pages: Vec<Page>,

    pub stats: CrawlStats,
    pub document: ReportDocument,

    /// Citations with no bibliography entry (a warning, not a failure)
    pub dangling: DanglingCitations,

    pub cache: CacheStats,
    pub generated_at: DateTime<Utc>,
}

impl ResearchReport {
    /// The rendered markdown document.
    pub fn markdown(&self) -> &str {
        self.document.markdown()
    }
}

/// Runs research questions end to end.
///
/// # Example
///
/// ```rust,ignore
/// let researcher = Researcher::builder()
///     .with_planner(ai.clone())
///     .with_section_writer(ai.clone())
///     .with_embedder(ai)
///     .with_searcher(searcher)
///     .with_crawl_service(firecrawl)
///     .with_store(store)
///     .build()?;
///
/// let report = researcher.run("How will grids store energy?").await?;
/// println!("{}", report.markdown());
/// ```
pub struct Researcher {
    planner: Arc<dyn Planner>,
    searcher: Arc<dyn WebSearcher>,
    orchestrator: CrawlOrchestrator,
    retrieval: RetrievalPipeline,
    cache: Arc<EmbeddingCache>,
    config: ResearchConfig,
    progress: Progress,
}

impl Researcher {
    pub fn builder() -> ResearcherBuilder {
        ResearcherBuilder::default()
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Run one research question.
    pub async fn run(&self, question: &str) -> Result<ResearchReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("research", run_id = %run_id);
        self.run_inner(run_id, question).instrument(span).await
    }

    /// Run with cancellation support.
    pub async fn run_with_cancel(
        &self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<ResearchReport> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResearchError::Cancelled),
            result = self.run(question) => result,
        }
    }

    /// Run on a fresh tokio runtime, blocking the calling thread.
    ///
    /// Inside an async context this fails with [`ResearchError::Runtime`];
    /// use [`Researcher::run`] there instead.
    pub fn run_blocking(&self, question: &str) -> Result<ResearchReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ResearchError::Runtime(std::io::Error::other(
                "run_blocking called from inside a tokio runtime",
            )));
        }

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(ResearchError::Runtime)?
            .block_on(self.run(question))
    }

    /// Search every keyword and merge the results.
    ///
    /// Keywords are searched concurrently. A failed search is logged and
    /// contributes nothing. The merged list keeps first occurrence order
    /// across keywords in plan order.
    pub async fn collect_urls(&self, keywords: &[String]) -> Vec<String> {
        let limit = self.config.search.urls_per_keyword;
        let searches = keywords.iter().map(|keyword| async move {
            match self.searcher.search_with_limit(keyword, limit).await {
                Ok(results) => {
                    debug!(keyword = %keyword, results = results.len(), "Keyword searched");
                    results
                }
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "Search failed, skipping keyword");
                    Vec::new()
                }
            }
        });

        let urls: IndexSet<String> = join_all(searches)
            .await
            .into_iter()
            .flatten()
            .map(|result| result.url.to_string())
            .collect();

        urls.into_iter().collect()
    }

    /// Release the embedding store.
    pub async fn close(&self) -> Result<()> {
        self.cache.close().await
    }

    async fn run_inner(&self, run_id: Uuid, question: &str) -> Result<ResearchReport> {
        info!(question = %question, "Research run starting");

        let plan = self.planner.plan(question).await?;
        info!(
            title = %plan.title,
            sections = plan.sections.len(),
            keywords = plan.keywords.len(),
            "Plan ready"
        );
        self.progress
            .emit(format!("· Keywords: {}", plan.keywords.join(", ")));

        let urls = self.collect_urls(&plan.keywords).await;
        self.progress
            .emit(format!("· Found {} unique URLs", urls.len()));

        let outcomes = self.orchestrator.crawl_detailed(&urls).await;
        let stats = CrawlStats::from_outcomes(&outcomes);
        let pages: Vec<Page> = outcomes
            .iter()
            .flat_map(|outcome| outcome.pages().iter().cloned())
            .collect();
        self.progress.emit(format!(
            "Crawled {}/{} URLs ({} pages)",
            stats.succeeded(),
            stats.urls,
            pages.len()
        ));

        let verified = self
            .retrieval
            .run(&plan.title, &plan.sections, &pages)
            .await?;

        let cache = self.cache.stats();
        info!(
            references = verified.document.references().len(),
            dangling = verified.dangling.len(),
            cache_hits = cache.hits,
            cache_misses = cache.misses,
            "Research run completed"
        );

        Ok(ResearchReport {
            run_id,
            question: question.to_string(),
            plan,
            urls,
            pages,
            stats,
            document: verified.document,
            dangling: verified.dangling,
            cache,
            generated_at: Utc::now(),
        })
    }
}

/// Builder for [`Researcher`].
///
/// Planner, searcher, crawl service, embedder and section writer are
/// required. The fetcher defaults to [`HttpExtractor`] and the store to an
/// in-process [`MemoryStore`].
#[derive(Default)]
pub struct ResearcherBuilder {
    planner: Option<Arc<dyn Planner>>,
    searcher: Option<Arc<dyn WebSearcher>>,
    crawl_service: Option<Arc<dyn CrawlService>>,
    fetcher: Option<Arc<dyn PageFetcher>>,
    embedder: Option<Arc<dyn Embedder>>,
    store: Option<Arc<dyn EmbeddingStore>>,
    section_writer: Option<Arc<dyn SectionWriter>>,
    config: ResearchConfig,
    progress: Progress,
}

impl ResearcherBuilder {
    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_searcher(mut self, searcher: Arc<dyn WebSearcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn with_crawl_service(mut self, service: Arc<dyn CrawlService>) -> Self {
        self.crawl_service = Some(service);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn EmbeddingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_section_writer(mut self, writer: Arc<dyn SectionWriter>) -> Self {
        self.section_writer = Some(writer);
        self
    }

    pub fn with_config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward progress lines to a presentation layer.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(self) -> Result<Researcher> {
        self.config.validate()?;

        let planner = self.planner.ok_or(ConfigError::Missing("planner"))?;
        let searcher = self.searcher.ok_or(ConfigError::Missing("searcher"))?;
        let service = self
            .crawl_service
            .ok_or(ConfigError::Missing("crawl service"))?;
        let embedder = self.embedder.ok_or(ConfigError::Missing("embedder"))?;
        let writer = self
            .section_writer
            .ok_or(ConfigError::Missing("section writer"))?;

        let fetcher: Arc<dyn PageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                HttpExtractor::new().with_body_chars(self.config.crawl.extract_body_chars),
            ),
        };
        let store: Arc<dyn EmbeddingStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };

        let cache = Arc::new(
            EmbeddingCache::new(store, embedder).with_enabled(self.config.index.use_cache),
        );
        let orchestrator = CrawlOrchestrator::new(service, fetcher, self.config.crawl.clone());
        let retrieval =
            RetrievalPipeline::new(cache.clone(), writer, self.config.index.clone())
                .with_progress(self.progress.clone());

        Ok(Researcher {
            planner,
            searcher,
            orchestrator,
            retrieval,
            cache,
            config: self.config,
            progress: self.progress,
        })
    }
}
