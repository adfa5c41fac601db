//! Summarizer adapter over an OpenAI-compatible chat-completions API.
//!
//! The orchestrator depends on the [`Summarizer`] trait; the production
//! implementation is [`OpenAiSummarizer`], which applies a fixed instruction
//! template and a truncation policy before submission. Upstream failures map
//! to `Summarization` errors, which the orchestrator records per target
//! rather than aborting the run.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pagebrief_shared::{PagebriefError, Result, SummarizerConfig};

/// Fixed system instruction applied to every page.
const SYSTEM_INSTRUCTION: &str =
    "You summarize documentation pages for a combined knowledge document. \
     Extract the page's purpose, its key capabilities and endpoints, the \
     required parameters, and any stated limitations. Be concise and \
     factual; do not invent details that are not in the text.";

/// Marker appended when the input had to be truncated.
const TRUNCATION_MARKER: &str = "\n\n[content truncated]";

/// Sampling temperature; kept low so repeated runs on identical input are
/// close to repeatable.
const TEMPERATURE: f32 = 0.3;

/// Completion token cap per page.
const MAX_TOKENS: u32 = 4000;

/// Request timeout for one summarization call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Summarization capability boundary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize cleaned page text. Fails with `Summarization` on any
    /// upstream failure.
    async fn summarize(&self, text: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Wire types (chat-completions subset)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// OpenAiSummarizer
// ---------------------------------------------------------------------------

/// Talks to `{base_url}/chat/completions` with bearer authentication.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
}

impl OpenAiSummarizer {
    /// Build a summarizer from config, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            PagebriefError::config(format!(
                "summarizer API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;

        Ok(Self::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            config.max_input_chars,
        ))
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_input_chars: usize,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("default reqwest client"),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_input_chars,
        }
    }

    /// Truncate input to the configured budget, marking the cut.
    fn truncate(&self, text: &str) -> String {
        if text.chars().count() <= self.max_input_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(self.max_input_chars).collect();
        format!("{cut}{TRUNCATION_MARKER}")
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let input = self.truncate(text);
        debug!(
            input_chars = input.len(),
            model = %self.model,
            "requesting page summary"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                Message {
                    role: "user",
                    content: &input,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "summarization request failed");
                PagebriefError::Summarization(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "summarization API error");
            return Err(PagebriefError::Summarization(format!(
                "API returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PagebriefError::Summarization(format!("invalid response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PagebriefError::Summarization("response contained no choices".into()))
    }
}
