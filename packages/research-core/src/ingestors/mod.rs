//! HTTP implementations of the boundary services.
//!
//! # Available Implementations
//!
//! - `HttpExtractor` - direct fetch + readability reduction (crawl fallback)
//! - `FirecrawlClient` - Firecrawl job API (requires `firecrawl` feature)
//! - `SearxSearcher` - SearxNG JSON search

mod http;
mod searx;

#[cfg(feature = "firecrawl")]
mod firecrawl;

pub use http::{extract_page, HttpExtractor, DEFAULT_USER_AGENT};
pub use searx::SearxSearcher;

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlClient;
