//! WebDriver-backed implementation of [`PageRenderer`].

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use pagebrief_shared::{PagebriefError, RendererConfig, Result};

use crate::PageRenderer;

/// Poll interval while waiting for `document.readyState == "complete"`.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Whether the viewport has reached the bottom of the document. Browsers
/// report fractional scroll offsets on scaled displays, so the comparison
/// carries a one-pixel tolerance.
fn reached_bottom(scrolled_to: f64, height: i64) -> bool {
    scrolled_to >= (height - 1) as f64
}

/// Renders pages through a WebDriver endpoint (geckodriver, chromedriver).
///
/// Each `render` call opens a fresh session, so concurrent renders never
/// share cookies, storage, or in-page state.
pub struct WebDriverRenderer {
    config: RendererConfig,
}

impl WebDriverRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Navigate and wait until the document reports itself complete.
    async fn navigate(&self, client: &Client, url: &Url) -> Result<()> {
        client
            .goto(url.as_str())
            .await
            .map_err(|e| PagebriefError::render(url.as_str(), format!("navigation failed: {e}")))?;

        loop {
            let state = client
                .execute("return document.readyState;", vec![])
                .await
                .map_err(|e| {
                    PagebriefError::render(url.as_str(), format!("readiness check failed: {e}"))
                })?;

            if state.as_str() == Some("complete") {
                return Ok(());
            }
            sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Scroll to the bottom in fixed steps until the document height stops
    /// growing, triggering lazy-loaded content along the way.
    async fn scroll_to_bottom(&self, client: &Client, url: &Url) -> Result<()> {
        let mut last_height: i64 = -1;

        loop {
            let probe = client
                .execute(
                    "window.scrollBy(0, arguments[0]); \
                     return [document.body.scrollHeight, \
                             window.innerHeight + window.scrollY];",
                    vec![json!(self.config.scroll_step_px)],
                )
                .await
                .map_err(|e| {
                    PagebriefError::render(url.as_str(), format!("scroll step failed: {e}"))
                })?;

            let height = probe
                .get(0)
                .and_then(|v| v.as_i64())
                .unwrap_or(last_height);
            let scrolled_to = probe.get(1).and_then(|v| v.as_f64()).unwrap_or(0.0);

            if reached_bottom(scrolled_to, height) && height == last_height {
                return Ok(());
            }
            last_height = height;

            sleep(Duration::from_millis(self.config.scroll_pause_ms)).await;
        }
    }

    /// The full in-session lifecycle: navigate, scroll, settle, capture.
    async fn render_in_session(&self, client: &Client, url: &Url) -> Result<String> {
        timeout(self.config.navigation_timeout(), self.navigate(client, url))
            .await
            .map_err(|_| PagebriefError::RenderTimeout {
                url: url.to_string(),
                budget_secs: self.config.navigation_timeout_secs,
            })??;

        timeout(
            self.config.settle_timeout(),
            self.scroll_to_bottom(client, url),
        )
        .await
        .map_err(|_| PagebriefError::RenderTimeout {
            url: url.to_string(),
            budget_secs: self.config.settle_timeout_secs,
        })??;

        sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        client
            .source()
            .await
            .map_err(|e| PagebriefError::render(url.as_str(), format!("source capture failed: {e}")))
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &Url, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(PagebriefError::Cancelled {
                url: url.to_string(),
            });
        }

        debug!(%url, webdriver = %self.config.webdriver_url, "opening browser session");

        let client = ClientBuilder::native()
            .connect(&self.config.webdriver_url)
            .await
            .map_err(|e| {
                PagebriefError::render(
                    url.as_str(),
                    format!(
                        "webdriver connect failed at {}: {e}",
                        self.config.webdriver_url
                    ),
                )
            })?;

        // The session must be released on every exit path, so the work runs
        // under select! and close() happens unconditionally afterwards.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PagebriefError::Cancelled {
                url: url.to_string(),
            }),
            res = self.render_in_session(&client, url) => res,
        };

        if let Err(e) = client.close().await {
            warn!(%url, error = %e, "failed to close browser session");
        }

        match &outcome {
            Ok(markup) => debug!(%url, markup_len = markup.len(), "page rendered"),
            Err(e) => debug!(%url, error = %e, "render failed"),
        }

        outcome
    }
}
