//! Error types for pagebrief.
//!
//! Library crates use [`PagebriefError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` or map it to HTTP
//! status codes for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all pagebrief operations.
#[derive(Debug, thiserror::Error)]
pub enum PagebriefError {
    /// The seed URL is missing, empty, or malformed. Fails the whole request
    /// before any network activity.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Navigation failure surfaced by the browser (DNS, TLS, HTTP error).
    /// Per-target: recorded as a failed section, never fatal to the run.
    #[error("render error for {url}: {reason}")]
    Render { url: String, reason: String },

    /// The page did not finish rendering within its time budget.
    /// Per-target, isolated like [`PagebriefError::Render`].
    #[error("render timed out for {url} after {budget_secs}s")]
    RenderTimeout { url: String, budget_secs: u64 },

    /// Upstream LLM failure (network, API, or response parsing).
    /// Per-target, isolated.
    #[error("summarization error: {0}")]
    Summarization(String),

    /// The knowledge document was produced but could not be saved.
    /// Fatal to the request.
    #[error("persistence error at {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A run-level cancellation signal interrupted this target.
    #[error("cancelled while processing {url}")]
    Cancelled { url: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error outside the knowledge-document sink.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagebriefError>;

impl PagebriefError {
    /// Create an invalid-input error from any displayable message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Create a render error for a URL.
    pub fn render(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Render {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure aborts the whole request (as opposed to being
    /// recorded as a failed section and carried in the document).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::Persistence { .. } | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PagebriefError::invalid_input("url must not be empty");
        assert_eq!(err.to_string(), "invalid input: url must not be empty");

        let err = PagebriefError::RenderTimeout {
            url: "https://docs.example.com/slow".into(),
            budget_secs: 120,
        };
        assert!(err.to_string().contains("after 120s"));
    }

    #[test]
    fn fatality_split_matches_propagation_policy() {
        assert!(PagebriefError::invalid_input("x").is_fatal());
        assert!(!PagebriefError::render("https://a", "dns failure").is_fatal());
        assert!(!PagebriefError::Summarization("api error".into()).is_fatal());
        assert!(
            !PagebriefError::Cancelled {
                url: "https://a".into()
            }
            .is_fatal()
        );
    }
}
