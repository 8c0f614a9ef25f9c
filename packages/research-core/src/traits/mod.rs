//! Boundary traits for the external services the pipeline depends on.
//!
//! Applications inject implementations as `Arc<dyn Trait>`; the
//! [`crate::testing`] module provides in-memory mocks for each.

pub mod ai;
pub mod crawl_service;
pub mod fetcher;
pub mod searcher;
pub mod store;
