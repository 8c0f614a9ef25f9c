//! Data types shared across the research pipeline.

pub mod config;
pub mod embedding;
pub mod page;
pub mod report;
