//! Crawl orchestration for pagebrief.
//!
//! Wires the renderer, extractor, and summarizer into a single pipeline:
//! validate the seed, discover targets from the rendered seed page, process
//! targets under a bounded worker pool, and persist the assembled knowledge
//! document.

pub mod crawl;
pub mod progress;
pub mod service;
pub mod sink;

pub use crawl::{CrawlOutcome, CrawlPipeline};
pub use progress::{ProgressReporter, SilentProgress};
pub use service::CrawlService;
