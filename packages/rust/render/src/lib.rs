//! Page renderer adapter over a WebDriver-compatible headless browser.
//!
//! The orchestrator depends on the [`PageRenderer`] trait; the production
//! implementation is [`WebDriverRenderer`], which owns the full page
//! lifecycle: open an isolated session, navigate, scroll to trigger
//! lazy-loaded content, settle, capture markup, and close the session on
//! every exit path.

mod webdriver;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use pagebrief_shared::Result;

pub use webdriver::WebDriverRenderer;

/// Rendering capability boundary: load a URL in a browser and return the
/// fully rendered markup.
///
/// Implementations must treat every call as an isolated browsing context (no
/// cookie or session sharing across calls) and must release all browser
/// resources before returning, on success, error, timeout, and cancellation
/// alike.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url` and return the page source.
    ///
    /// Fails with `RenderTimeout` when the page does not load or settle
    /// within the configured budgets, `Render` for navigation failures, and
    /// `Cancelled` when `cancel` fires mid-render.
    async fn render(&self, url: &Url, cancel: &CancellationToken) -> Result<String>;
}
