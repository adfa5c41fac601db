//! Progress reporting for crawl runs.

use pagebrief_shared::PageSection;

use crate::crawl::CrawlOutcome;

/// Callback interface for reporting pipeline status to a front end.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a target's section has been produced.
    fn target_finished(&self, section: &PageSection, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, outcome: &CrawlOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn target_finished(&self, _section: &PageSection, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &CrawlOutcome) {}
}
