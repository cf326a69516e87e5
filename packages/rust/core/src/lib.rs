//! Aggregation pipeline for arxivdigest.
//!
//! This crate ties listing parsing, deduplication, revision resolution and
//! batch sorting into one run over the configured categories.

pub mod buffer;
pub mod dedup;
pub mod pipeline;

pub use buffer::CompletionBuffer;
pub use dedup::Deduplicator;
pub use pipeline::{AggregateResult, ProgressReporter, SilentProgress, aggregate};
