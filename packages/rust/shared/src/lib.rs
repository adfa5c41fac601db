//! Shared types, error model, and configuration for pagebrief.
//!
//! This crate is the foundation depended on by all other pagebrief crates.
//! It provides:
//! - [`PagebriefError`] — the unified error type
//! - Domain types ([`PageTarget`], [`PageSection`], [`KnowledgeDocument`], [`CrawlId`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSettings, OutputConfig, RendererConfig, SummarizerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{PagebriefError, Result};
pub use types::{
    CrawlId, ExtractedLink, KnowledgeDocument, PageSection, PageTarget, SEED_LABEL,
    SectionOutcome, normalize_url,
};
