//! Core domain types for pagebrief crawl runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Display label given to the seed page in every knowledge document.
pub const SEED_LABEL: &str = "Main Page";

// ---------------------------------------------------------------------------
// CrawlId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for crawl-invocation identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrawlId(pub Uuid);

impl CrawlId {
    /// Generate a new time-sortable crawl identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CrawlId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CrawlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CrawlId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// URL identity
// ---------------------------------------------------------------------------

/// Normalize a URL for target identity: scheme + host + path + query,
/// fragment stripped.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.to_string()
}

// ---------------------------------------------------------------------------
// PageTarget & ExtractedLink
// ---------------------------------------------------------------------------

/// A single URL scheduled for rendering, cleaning, and summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTarget {
    /// Absolute URL of the page.
    pub url: Url,
    /// Display text, taken from the first link that discovered this target.
    pub label: String,
}

impl PageTarget {
    /// Build the seed target (always position 0 in the target list).
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            label: SEED_LABEL.to_string(),
        }
    }

    /// Identity key for deduplication.
    pub fn identity(&self) -> String {
        normalize_url(&self.url)
    }
}

/// An anchor discovered in rendered markup, already resolved to an absolute
/// URL. Fragment-only anchors never produce an `ExtractedLink`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLink {
    /// Absolute URL the anchor points at.
    pub url: Url,
    /// Trimmed inner text of the anchor (empty if absent).
    pub text: String,
}

// ---------------------------------------------------------------------------
// PageSection & KnowledgeDocument
// ---------------------------------------------------------------------------

/// Outcome of processing one target: a summary or a failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SectionOutcome {
    /// The page was rendered, cleaned, and summarized.
    Summary(String),
    /// Processing failed; the reason is carried inline in the document.
    Failed(String),
}

/// One block of the knowledge document, produced exactly once per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSection {
    pub target: PageTarget,
    pub outcome: SectionOutcome,
}

impl PageSection {
    pub fn summarized(target: PageTarget, summary: impl Into<String>) -> Self {
        Self {
            target,
            outcome: SectionOutcome::Summary(summary.into()),
        }
    }

    pub fn failed(target: PageTarget, reason: impl Into<String>) -> Self {
        Self {
            target,
            outcome: SectionOutcome::Failed(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SectionOutcome::Failed(_))
    }
}

/// The ordered aggregation of per-page summaries produced by one crawl
/// invocation. Append-only during a run; immutable once the run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Identifier of the crawl invocation that produced this document.
    pub crawl_id: CrawlId,
    /// The seed URL the run started from.
    pub source_url: Url,
    /// When the document was finalized.
    pub generated_at: DateTime<Utc>,
    /// One section per target, in discovery order with the seed first.
    pub sections: Vec<PageSection>,
}

impl KnowledgeDocument {
    /// Render the document to its persistent text form: a header naming the
    /// seed URL, then one block per section with label, URL, and the summary
    /// or a failure marker.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("# Knowledge Document\n\n");
        out.push_str(&format!("Source: {}\n", self.source_url));
        out.push_str(&format!("Generated: {}\n", self.generated_at.to_rfc3339()));
        out.push_str(&format!("Pages: {}\n", self.sections.len()));

        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n", section.target.label));
            out.push_str(&format!("URL: {}\n\n", section.target.url));
            match &section.outcome {
                SectionOutcome::Summary(summary) => {
                    out.push_str(summary.trim_end());
                    out.push('\n');
                }
                SectionOutcome::Failed(reason) => {
                    out.push_str(&format!("[FAILED: {reason}]\n"));
                }
            }
        }

        out
    }

    /// Number of sections that failed.
    pub fn failed_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_failed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn crawl_id_roundtrip() {
        let id = CrawlId::new();
        let s = id.to_string();
        let parsed: CrawlId = s.parse().expect("parse CrawlId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn normalize_strips_fragment_keeps_query() {
        let u = url("https://docs.example.com/guide?page=2#section-1");
        assert_eq!(normalize_url(&u), "https://docs.example.com/guide?page=2");
    }

    #[test]
    fn seed_target_gets_main_page_label() {
        let target = PageTarget::seed(url("https://docs.example.com/"));
        assert_eq!(target.label, "Main Page");
        assert_eq!(target.identity(), "https://docs.example.com/");
    }

    #[test]
    fn document_renders_summary_and_failure_blocks() {
        let doc = KnowledgeDocument {
            crawl_id: CrawlId::new(),
            source_url: url("https://docs.example.com/"),
            generated_at: Utc::now(),
            sections: vec![
                PageSection::summarized(
                    PageTarget::seed(url("https://docs.example.com/")),
                    "Overview of the API.",
                ),
                PageSection::failed(
                    PageTarget {
                        url: url("https://docs.example.com/api"),
                        label: "API".into(),
                    },
                    "render timed out for https://docs.example.com/api after 120s",
                ),
            ],
        };

        let text = doc.render_text();
        assert!(text.starts_with("# Knowledge Document"));
        assert!(text.contains("Source: https://docs.example.com/"));
        assert!(text.contains("## Main Page"));
        assert!(text.contains("Overview of the API."));
        assert!(text.contains("## API"));
        assert!(text.contains("[FAILED: render timed out"));
        assert_eq!(doc.failed_count(), 1);
    }

    #[test]
    fn section_serialization_roundtrip() {
        let section = PageSection::summarized(
            PageTarget {
                url: url("https://docs.example.com/faq"),
                label: "FAQ".into(),
            },
            "Answers to common questions.",
        );

        let json = serde_json::to_string(&section).expect("serialize");
        let parsed: PageSection = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, section);
    }
}
