//! Object-safe service seam over the crawl pipeline.
//!
//! Front ends (the HTTP server in particular) hold an `Arc<dyn CrawlService>`
//! so handlers can be tested against a stub without a browser or model.

use async_trait::async_trait;

use pagebrief_render::PageRenderer;
use pagebrief_shared::Result;
use pagebrief_summarize::Summarizer;

use crate::crawl::{CrawlOutcome, CrawlPipeline};

/// One crawl invocation per call, independent of any other call.
#[async_trait]
pub trait CrawlService: Send + Sync {
    async fn crawl(&self, seed: &str) -> Result<CrawlOutcome>;
}

#[async_trait]
impl<R, S> CrawlService for CrawlPipeline<R, S>
where
    R: PageRenderer + 'static,
    S: Summarizer + 'static,
{
    async fn crawl(&self, seed: &str) -> Result<CrawlOutcome> {
        self.run(seed).await
    }
}
