//! Crawl orchestration.
//!
//! - `CrawlOrchestrator` - bounded-concurrency crawl with service-then-fetch fallback
//! - `PollPolicy` - deadline and attempt bounds for job polling

pub mod orchestrator;
pub mod poll;

pub use orchestrator::{CrawlOrchestrator, CrawlOutcome, CrawlStats, CrawlVia};
pub use poll::{PollPolicy, PollState};
