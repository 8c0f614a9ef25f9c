//! Cited Research Reports from the Open Web
//!
//! A retrieval pipeline that turns a research question into a markdown report
//! whose every claim is citable to a crawled page.
//!
//! # Design Philosophy
//!
//! - The core is mechanics: crawling, caching, indexing, verification
//! - Language models, search and crawling services are injected behind traits
//! - Per-URL failures degrade the result, never abort the run
//! - Dangling citations are reported, not hidden and not fatal
//!
//! # Usage
//!
//! ```rust,ignore
//! use research_core::{Researcher, MemoryStore};
//!
//! let researcher = Researcher::builder()
//!     .with_planner(planner)
//!     .with_searcher(searcher)
//!     .with_crawl_service(crawl_service)
//!     .with_embedder(embedder)
//!     .with_section_writer(writer)
//!     .build()?;
//!
//! let report = researcher.run("How will grids store energy?").await?;
//! if !report.dangling.is_empty() {
//!     eprintln!("unresolved citations: {}", report.dangling);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Boundary traits (search, crawl service, fetcher, models, store)
//! - [`types`] - Pages, plans, reports, configuration
//! - [`crawlers`] - Bounded-concurrency crawl orchestration and job polling
//! - [`ingestors`] - HTTP implementations (extractor, Firecrawl, SearxNG)
//! - [`pipeline`] - Embedding cache, vector index, retrieval and verification
//! - [`stores`] - Embedding cache persistence (MemoryStore, SqliteStore)
//! - [`security`] - Service endpoints and redacted API keys
//! - [`testing`] - Mock implementations for testing

pub mod crawlers;
pub mod error;
pub mod ingestors;
pub mod pipeline;
pub mod security;
pub mod stores;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use crawlers::{CrawlOrchestrator, CrawlOutcome, CrawlStats, CrawlVia, PollPolicy};
pub use error::{ConfigError, CrawlError, CrawlResult, ResearchError, Result};
pub use ingestors::{HttpExtractor, SearxSearcher};
pub use pipeline::{
    DanglingCitations, EmbeddingCache, Progress, ResearchReport, Researcher, ResearcherBuilder,
    RetrievalPipeline, VectorIndex,
};
pub use security::{SecretString, ServiceEndpoint};
pub use stores::MemoryStore;
pub use traits::{
    ai::{Embedder, Planner, SectionWriter},
    crawl_service::{CrawlService, JobId, JobStatus},
    fetcher::PageFetcher,
    searcher::{SearchResult, WebSearcher},
    store::EmbeddingStore,
};
pub use types::{
    config::{CrawlConfig, IndexConfig, ResearchConfig, SearchConfig},
    embedding::ContentHash,
    page::{Page, PageSource},
    report::{Reference, ReportDocument, ResearchPlan, Section, Snippet},
};

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

#[cfg(feature = "firecrawl")]
pub use ingestors::FirecrawlClient;

#[cfg(feature = "openai")]
pub use ai::OpenAI;
