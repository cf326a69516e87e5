//! Shared types, error model, and configuration for arxivdigest.
//!
//! This crate is the foundation depended on by all other arxivdigest crates.
//! It provides:
//! - [`DigestError`] — the unified error type
//! - Domain types ([`Category`], [`Section`], [`Stub`], [`ResolvedRecord`], [`EmittedRecord`])
//! - The category prioritizer ([`CategoryPriorities`])
//! - Configuration ([`AppConfig`], [`DigestConfig`], config loading)

pub mod config;
pub mod error;
pub mod priority;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CATEGORIES_ENV, CrawlSection, DigestConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, parse_category_list,
};
pub use error::{DigestError, Result};
pub use priority::{CategoryPriorities, DEFAULT_PRIORITY, MAX_OVERRIDE};
pub use types::{
    Category, DEFAULT_REVISION, EmittedRecord, ResolvedRecord, Section, Stub, document_url,
    listing_url,
};
