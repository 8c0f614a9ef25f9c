//! Retrieval pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Embedding through a content-addressed cache
//! - A flat inner-product index over crawled page texts
//! - Per-section retrieval and generation
//! - Document assembly and citation verification
//! - The end-to-end research run (plan → search → crawl → report)

pub mod assemble;
pub mod embed;
pub mod grounding;
pub mod index;
pub mod progress;
pub mod prompts;
pub mod research;
pub mod retrieval;

pub use assemble::{assemble_document, build_references};
pub use embed::{CacheStats, EmbeddingCache};
pub use grounding::{extract_citations, find_dangling, verify_citations, DanglingCitations};
pub use index::{Neighbor, VectorIndex};
pub use progress::Progress;
pub use prompts::{
    format_planner_prompt, format_section_prompt, format_snippets, parse_plan, DEFAULT_OUTLINE,
    PLANNER_PROMPT, PLANNER_SYSTEM_PROMPT, SECTION_PROMPT, SECTION_SYSTEM_PROMPT,
};
pub use research::{ResearchReport, Researcher, ResearcherBuilder};
pub use retrieval::{RetrievalPipeline, VerifiedDocument};
