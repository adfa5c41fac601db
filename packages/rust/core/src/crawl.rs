//! The crawl orchestrator: seed validation, link discovery, bounded fan-out
//! over targets, and ordered assembly of the knowledge document.
//!
//! Each `run` call is one independent crawl invocation with no state shared
//! across invocations. Per-target failures (render, summarization) become
//! failed sections; only invalid input and persistence failures abort a run.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use pagebrief_extract::{clean, extract_links};
use pagebrief_render::PageRenderer;
use pagebrief_shared::{
    CrawlConfig, CrawlId, ExtractedLink, KnowledgeDocument, PageSection, PageTarget,
    PagebriefError, Result, normalize_url,
};
use pagebrief_summarize::Summarizer;

use crate::progress::{ProgressReporter, SilentProgress};
use crate::sink;

// ---------------------------------------------------------------------------
// CrawlOutcome
// ---------------------------------------------------------------------------

/// Result of one completed crawl invocation.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// The finalized knowledge document.
    pub document: KnowledgeDocument,
    /// The full target list in discovery order, seed first.
    pub targets: Vec<PageTarget>,
    /// Where the document text was written.
    pub output_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// CrawlPipeline
// ---------------------------------------------------------------------------

/// Orchestrates one crawl invocation: render the seed, discover targets,
/// process each target under a bounded worker pool, assemble and persist the
/// document.
pub struct CrawlPipeline<R, S> {
    renderer: Arc<R>,
    summarizer: Arc<S>,
    config: CrawlConfig,
}

impl<R, S> CrawlPipeline<R, S>
where
    R: PageRenderer + 'static,
    S: Summarizer + 'static,
{
    pub fn new(renderer: R, summarizer: S, config: CrawlConfig) -> Self {
        Self {
            renderer: Arc::new(renderer),
            summarizer: Arc::new(summarizer),
            config,
        }
    }

    /// Run a crawl with no external cancellation and no progress reporting.
    pub async fn run(&self, seed: &str) -> Result<CrawlOutcome> {
        self.run_with(seed, CancellationToken::new(), &SilentProgress)
            .await
    }

    /// Run a crawl. `cancel` propagates to all in-flight renders and
    /// summarizations; targets interrupted by it are recorded as failed
    /// sections and the run still finalizes with whatever completed.
    #[instrument(skip_all, fields(seed = %seed, crawl_id = tracing::field::Empty))]
    pub async fn run_with(
        &self,
        seed: &str,
        cancel: CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<CrawlOutcome> {
        let start = Instant::now();
        let crawl_id = CrawlId::new();
        tracing::Span::current().record("crawl_id", tracing::field::display(&crawl_id));

        // --- Seeding ---
        let seed_url = validate_seed(seed)?;
        info!(%crawl_id, url = %seed_url, "starting crawl");

        // --- Discovering ---
        progress.phase("Discovering links");
        let seed_render: std::result::Result<String, String> = self
            .renderer
            .render(&seed_url, &cancel)
            .await
            .map_err(|e| e.to_string());

        let links = match &seed_render {
            Ok(markup) => extract_links(markup, &seed_url),
            Err(reason) => {
                // The seed still gets its (failed) section; there is just
                // nothing to discover from it.
                warn!(url = %seed_url, reason, "seed render failed");
                Vec::new()
            }
        };

        let targets = build_targets(&seed_url, &links);
        info!(
            target_count = targets.len(),
            discovered_links = links.len(),
            "discovery complete"
        );

        // --- Crawling ---
        progress.phase("Crawling targets");
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut handles = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().cloned().enumerate() {
            let renderer = Arc::clone(&self.renderer);
            let summarizer = Arc::clone(&self.summarizer);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            // The seed was already rendered during discovery; reuse it.
            let prerendered = (index == 0).then(|| seed_render.clone());

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return PageSection::failed(target, "worker pool shut down");
                    }
                };
                process_target(renderer, summarizer, target, prerendered, cancel).await
            }));
        }

        // Collect by index, not by completion order: the document order is an
        // invariant, not an accident of scheduling.
        let total = targets.len();
        let mut sections = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            let section = match handle.await {
                Ok(section) => section,
                Err(e) => {
                    warn!(index, error = %e, "target task failed");
                    PageSection::failed(targets[index].clone(), format!("task failed: {e}"))
                }
            };
            progress.target_finished(&section, index + 1, total);
            sections.push(section);
        }

        // --- Finalizing ---
        progress.phase("Writing knowledge document");
        let document = KnowledgeDocument {
            crawl_id,
            source_url: seed_url,
            generated_at: Utc::now(),
            sections,
        };

        let output_path = self.config.knowledge_file.clone();
        sink::write_document(&output_path, &document.render_text())?;

        let outcome = CrawlOutcome {
            document,
            targets,
            output_path,
            elapsed: start.elapsed(),
        };

        info!(
            target_count = outcome.targets.len(),
            failed = outcome.document.failed_count(),
            elapsed_ms = outcome.elapsed.as_millis(),
            "crawl complete"
        );
        progress.done(&outcome);

        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Validate the seed URL before any network activity.
fn validate_seed(seed: &str) -> Result<Url> {
    let trimmed = seed.trim();
    if trimmed.is_empty() {
        return Err(PagebriefError::invalid_input("url must not be empty"));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| PagebriefError::invalid_input(format!("malformed url '{trimmed}': {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PagebriefError::invalid_input(format!(
            "unsupported scheme '{}': expected http or https",
            url.scheme()
        )));
    }

    Ok(url)
}

// ---------------------------------------------------------------------------
// Discovering
// ---------------------------------------------------------------------------

/// Build the crawl target list: the seed first (labeled "Main Page"), then
/// discovered links deduplicated by normalized URL in first-seen order. Links
/// back to the seed are dropped; duplicate links keep their first-seen label.
fn build_targets(seed: &Url, links: &[ExtractedLink]) -> Vec<PageTarget> {
    let seed_target = PageTarget::seed(seed.clone());

    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(seed_target.identity());

    let mut targets = vec![seed_target];

    for link in links {
        let mut url = link.url.clone();
        url.set_fragment(None);

        if !seen.insert(normalize_url(&url)) {
            continue;
        }

        let label = if link.text.is_empty() {
            url.to_string()
        } else {
            link.text.clone()
        };

        targets.push(PageTarget { url, label });
    }

    targets
}

// ---------------------------------------------------------------------------
// Crawling
// ---------------------------------------------------------------------------

/// Process one target: render (unless prerendered), clean, summarize.
/// Never fails — every failure becomes a failed section for this target.
async fn process_target<R, S>(
    renderer: Arc<R>,
    summarizer: Arc<S>,
    target: PageTarget,
    prerendered: Option<std::result::Result<String, String>>,
    cancel: CancellationToken,
) -> PageSection
where
    R: PageRenderer,
    S: Summarizer,
{
    if cancel.is_cancelled() {
        return cancelled_section(target);
    }

    let markup = match prerendered {
        Some(Ok(markup)) => markup,
        Some(Err(reason)) => return PageSection::failed(target, reason),
        None => match renderer.render(&target.url, &cancel).await {
            Ok(markup) => markup,
            Err(e) => {
                debug!(url = %target.url, error = %e, "render failed for target");
                return PageSection::failed(target, e.to_string());
            }
        },
    };

    let text = clean(&markup);

    let summary = tokio::select! {
        biased;
        _ = cancel.cancelled() => return cancelled_section(target),
        res = summarizer.summarize(&text) => res,
    };

    match summary {
        Ok(summary) => PageSection::summarized(target, summary),
        Err(e) => {
            debug!(url = %target.url, error = %e, "summarization failed for target");
            PageSection::failed(target, e.to_string())
        }
    }
}

fn cancelled_section(target: PageTarget) -> PageSection {
    let reason = PagebriefError::Cancelled {
        url: target.url.to_string(),
    }
    .to_string();
    PageSection::failed(target, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pagebrief_shared::SectionOutcome;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn link(u: &str, text: &str) -> ExtractedLink {
        ExtractedLink {
            url: url(u),
            text: text.into(),
        }
    }

    #[test]
    fn validate_rejects_empty_and_malformed() {
        assert!(matches!(
            validate_seed("").unwrap_err(),
            PagebriefError::InvalidInput { .. }
        ));
        assert!(matches!(
            validate_seed("   ").unwrap_err(),
            PagebriefError::InvalidInput { .. }
        ));
        assert!(matches!(
            validate_seed("not a url").unwrap_err(),
            PagebriefError::InvalidInput { .. }
        ));
        assert!(matches!(
            validate_seed("ftp://example.com").unwrap_err(),
            PagebriefError::InvalidInput { .. }
        ));
        assert!(validate_seed("https://docs.example.com/").is_ok());
    }

    #[test]
    fn seed_is_always_first_even_with_self_link() {
        let seed = url("https://docs.example.com/");
        let links = vec![
            link("https://docs.example.com/", "Home"),
            link("https://docs.example.com/api", "API"),
        ];

        let targets = build_targets(&seed, &links);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].label, "Main Page");
        assert_eq!(targets[0].url, seed);
        assert_eq!(targets[1].label, "API");
    }

    #[test]
    fn targets_are_deduplicated_by_normalized_url() {
        let seed = url("https://docs.example.com/");
        let links = vec![
            link("https://docs.example.com/api", "API"),
            link("https://docs.example.com/api#auth", "API auth section"),
            link("https://docs.example.com/api", "API again"),
            link("https://docs.example.com/faq", "FAQ"),
        ];

        let targets = build_targets(&seed, &links);
        let identities: Vec<String> = targets.iter().map(|t| t.identity()).collect();
        let unique: HashSet<&String> = identities.iter().collect();
        assert_eq!(identities.len(), unique.len());

        assert_eq!(targets.len(), 3);
        // First-seen label wins.
        assert_eq!(targets[1].label, "API");
        assert_eq!(targets[2].label, "FAQ");
    }

    #[test]
    fn empty_link_text_falls_back_to_url_label() {
        let seed = url("https://docs.example.com/");
        let links = vec![link("https://docs.example.com/api", "")];

        let targets = build_targets(&seed, &links);
        assert_eq!(targets[1].label, "https://docs.example.com/api");
    }

    // -----------------------------------------------------------------------
    // Pipeline tests with fake renderer/summarizer
    // -----------------------------------------------------------------------

    /// Serves canned markup per URL; a missing entry is a render failure.
    /// Optional per-URL delay exercises out-of-order completion.
    struct FakeRenderer {
        pages: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
    }

    impl FakeRenderer {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, html)| (u.to_string(), html.to_string()))
                    .collect(),
                delays: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn render(&self, url: &Url, _cancel: &CancellationToken) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(url.as_str()) {
                tokio::time::sleep(*delay).await;
            }
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| PagebriefError::render(url.as_str(), "connection refused"))
        }
    }

    /// Echoes its input prefixed with `summary of:`; can be told to fail on
    /// specific call indices (0-based, in call order).
    struct FakeSummarizer {
        fail_on: Vec<usize>,
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
    }

    impl FakeSummarizer {
        fn new() -> Self {
            Self {
                fail_on: Vec::new(),
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(indices: &[usize]) -> Self {
            Self {
                fail_on: indices.to_vec(),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn summarize(&self, text: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(text.to_string());
            if self.fail_on.contains(&call) {
                return Err(PagebriefError::Summarization("model unavailable".into()));
            }
            Ok(format!("summary of: {text}"))
        }
    }

    fn test_config(name: &str) -> CrawlConfig {
        let dir = std::env::temp_dir().join(format!("pb-crawl-{}-{}", name, std::process::id()));
        CrawlConfig {
            concurrency: 4,
            knowledge_file: dir.join("knowledge_document.txt"),
        }
    }

    fn cleanup(config: &CrawlConfig) {
        if let Some(dir) = config.knowledge_file.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    const SEED_HTML: &str = r##"<html><body>
        <main>
          <h1>Docs home</h1>
          <a href="/api">API Reference</a>
          <a href="/faq">FAQ</a>
          <a href="#top">Back to top</a>
          <a href="/api">API Reference (footer)</a>
          <a href="https://docs.example.com/">Home</a>
        </body></html>"##;

    #[tokio::test]
    async fn end_to_end_crawl_produces_ordered_document() {
        let renderer = FakeRenderer::new(&[
            ("https://docs.example.com/", SEED_HTML),
            (
                "https://docs.example.com/api",
                "<html><body><main>API endpoints</main></body></html>",
            ),
            (
                "https://docs.example.com/faq",
                "<html><body><main>Common questions</main></body></html>",
            ),
        ]);
        let config = test_config("e2e");
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config.clone());

        let outcome = pipeline.run("https://docs.example.com/").await.unwrap();

        // Seed first, then discovery order; fragment-only and duplicate
        // links excluded, self-link excluded.
        let labels: Vec<&str> = outcome
            .targets
            .iter()
            .map(|t| t.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Main Page", "API Reference", "FAQ"]);

        assert_eq!(outcome.document.sections.len(), 3);
        assert_eq!(outcome.document.failed_count(), 0);
        match &outcome.document.sections[1].outcome {
            SectionOutcome::Summary(s) => assert!(s.contains("API endpoints")),
            other => panic!("expected summary, got {other:?}"),
        }

        // The seed markup is rendered once and reused for its own section.
        let written = std::fs::read_to_string(&outcome.output_path).unwrap();
        assert!(written.starts_with("# Knowledge Document"));
        assert!(written.contains("## API Reference"));
        assert!(written.contains("URL: https://docs.example.com/faq"));

        cleanup(&config);
    }

    #[tokio::test]
    async fn seed_markup_is_rendered_once() {
        let renderer = FakeRenderer::new(&[(
            "https://docs.example.com/",
            "<html><body><main>no links here</main></body></html>",
        )]);
        let config = test_config("seed-once");
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config.clone());

        let outcome = pipeline.run("https://docs.example.com/").await.unwrap();

        assert_eq!(outcome.targets.len(), 1);
        assert_eq!(
            pipeline.renderer.calls.load(Ordering::SeqCst),
            1,
            "seed must not be re-rendered for its own section"
        );

        // The summarizer sees cleaned text, not the raw markup.
        let inputs = pipeline.summarizer.inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].contains("no links here"));
        assert!(!inputs[0].contains("<main>"));
        cleanup(&config);
    }

    #[tokio::test]
    async fn render_failure_is_isolated_to_its_section() {
        // /api has no canned page, so its render fails.
        let renderer = FakeRenderer::new(&[
            ("https://docs.example.com/", SEED_HTML),
            (
                "https://docs.example.com/faq",
                "<html><body><main>Common questions</main></body></html>",
            ),
        ]);
        let config = test_config("render-fail");
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config.clone());

        let outcome = pipeline.run("https://docs.example.com/").await.unwrap();

        assert_eq!(outcome.document.sections.len(), 3);
        assert_eq!(outcome.document.failed_count(), 1);
        assert!(outcome.document.sections[1].is_failed());
        assert!(!outcome.document.sections[2].is_failed());

        let written = std::fs::read_to_string(&outcome.output_path).unwrap();
        assert!(written.contains("[FAILED:"));
        assert!(written.contains("Common questions"));
        cleanup(&config);
    }

    #[tokio::test]
    async fn summarizer_failure_is_isolated_to_its_section() {
        let renderer = FakeRenderer::new(&[
            ("https://docs.example.com/", SEED_HTML),
            (
                "https://docs.example.com/api",
                "<html><body><main>API endpoints</main></body></html>",
            ),
            (
                "https://docs.example.com/faq",
                "<html><body><main>Common questions</main></body></html>",
            ),
        ]);
        // Serialize the run so call order matches target order, then fail
        // the second summarization.
        let config = CrawlConfig {
            concurrency: 1,
            ..test_config("summ-fail")
        };
        let pipeline =
            CrawlPipeline::new(renderer, FakeSummarizer::failing_on(&[1]), config.clone());

        let outcome = pipeline.run("https://docs.example.com/").await.unwrap();

        assert_eq!(outcome.document.failed_count(), 1);
        assert!(!outcome.document.sections[0].is_failed());
        assert!(outcome.document.sections[1].is_failed());
        assert!(!outcome.document.sections[2].is_failed());
        match &outcome.document.sections[1].outcome {
            SectionOutcome::Failed(reason) => assert!(reason.contains("model unavailable")),
            other => panic!("expected failure, got {other:?}"),
        }
        cleanup(&config);
    }

    #[tokio::test]
    async fn document_order_is_discovery_order_regardless_of_completion() {
        // The first discovered target is the slowest; it must still come
        // before the faster ones in the document.
        let renderer = FakeRenderer::new(&[
            ("https://docs.example.com/", SEED_HTML),
            (
                "https://docs.example.com/api",
                "<html><body><main>API endpoints</main></body></html>",
            ),
            (
                "https://docs.example.com/faq",
                "<html><body><main>Common questions</main></body></html>",
            ),
        ])
        .with_delay("https://docs.example.com/api", Duration::from_millis(80));
        let config = test_config("order");
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config.clone());

        let outcome = pipeline.run("https://docs.example.com/").await.unwrap();

        let section_urls: Vec<&str> = outcome
            .document
            .sections
            .iter()
            .map(|s| s.target.url.as_str())
            .collect();
        assert_eq!(
            section_urls,
            vec![
                "https://docs.example.com/",
                "https://docs.example.com/api",
                "https://docs.example.com/faq",
            ]
        );
        cleanup(&config);
    }

    #[tokio::test]
    async fn seed_render_failure_still_finalizes_a_document() {
        let renderer = FakeRenderer::new(&[]);
        let config = test_config("seed-fail");
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config.clone());

        let outcome = pipeline.run("https://docs.example.com/").await.unwrap();

        assert_eq!(outcome.targets.len(), 1);
        assert_eq!(outcome.document.failed_count(), 1);
        assert!(outcome.output_path.exists());
        cleanup(&config);
    }

    #[tokio::test]
    async fn cancellation_fails_remaining_targets_but_finalizes() {
        let renderer = FakeRenderer::new(&[
            ("https://docs.example.com/", SEED_HTML),
            (
                "https://docs.example.com/api",
                "<html><body><main>API endpoints</main></body></html>",
            ),
        ]);
        let config = test_config("cancel");
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        // Discovery already happened by the time targets run, so the run
        // completes but every section is a cancellation failure.
        let outcome = pipeline
            .run_with("https://docs.example.com/", cancel, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(outcome.document.failed_count(), outcome.targets.len());
        for section in &outcome.document.sections {
            match &section.outcome {
                SectionOutcome::Failed(reason) => assert!(reason.contains("cancelled")),
                other => panic!("expected cancellation failure, got {other:?}"),
            }
        }
        assert!(outcome.output_path.exists());
        cleanup(&config);
    }

    #[tokio::test]
    async fn unwritable_output_path_fails_the_run() {
        let renderer = FakeRenderer::new(&[(
            "https://docs.example.com/",
            "<html><body><main>content</main></body></html>",
        )]);
        let config = CrawlConfig {
            concurrency: 2,
            knowledge_file: PathBuf::from("/proc/not-a-place/doc.txt"),
        };
        let pipeline = CrawlPipeline::new(renderer, FakeSummarizer::new(), config);

        let err = pipeline.run("https://docs.example.com/").await.unwrap_err();
        assert!(matches!(err, PagebriefError::Persistence { .. }));
    }
}
