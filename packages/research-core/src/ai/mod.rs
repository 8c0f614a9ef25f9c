//! Language-model implementations.
//!
//! This module provides reference implementations of the [`Embedder`],
//! [`SectionWriter`] and [`Planner`] traits. Users can use these directly or
//! implement their own.
//!
//! [`Embedder`]: crate::traits::ai::Embedder
//! [`SectionWriter`]: crate::traits::ai::SectionWriter
//! [`Planner`]: crate::traits::ai::Planner

mod openai;

pub use openai::OpenAI;
