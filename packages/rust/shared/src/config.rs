//! Application configuration for pagebrief.
//!
//! User config lives at `~/.pagebrief/pagebrief.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PagebriefError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagebrief.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagebrief";

// ---------------------------------------------------------------------------
// Config structs (matching pagebrief.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Headless-browser rendering settings.
    #[serde(default)]
    pub renderer: RendererConfig,

    /// LLM summarization settings.
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Crawl settings.
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[renderer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// WebDriver endpoint to connect to.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Navigation budget, in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Post-load settle budget (scroll loop + quiescence), in seconds.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_secs: u64,

    /// Scroll step distance in pixels for the lazy-load loop.
    #[serde(default = "default_scroll_step")]
    pub scroll_step_px: u32,

    /// Pause between scroll steps, in milliseconds.
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ms: u64,

    /// Final delay after the document height stabilizes, in milliseconds.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            navigation_timeout_secs: default_navigation_timeout(),
            settle_timeout_secs: default_settle_timeout(),
            scroll_step_px: default_scroll_step(),
            scroll_pause_ms: default_scroll_pause(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".into()
}
fn default_navigation_timeout() -> u64 {
    120
}
fn default_settle_timeout() -> u64 {
    60
}
fn default_scroll_step() -> u32 {
    600
}
fn default_scroll_pause() -> u64 {
    250
}
fn default_settle_delay() -> u64 {
    1000
}

/// `[summarizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Model to use for summarization.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum characters of page text submitted per request.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_api_base_url(),
            model: default_model(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_input_chars() -> usize {
    12_000
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Maximum concurrent targets in flight (each owns its own browser
    /// session).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path the finalized knowledge document is written to. Overwritten on
    /// every run.
    #[serde(default = "default_knowledge_file")]
    pub knowledge_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            knowledge_file: default_knowledge_file(),
        }
    }
}

fn default_knowledge_file() -> String {
    "knowledge_document.txt".into()
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum concurrent targets in flight.
    pub concurrency: usize,
    /// Path for the knowledge document.
    pub knowledge_file: PathBuf,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.crawl.concurrency.max(1),
            knowledge_file: PathBuf::from(&config.output.knowledge_file),
        }
    }
}

impl RendererConfig {
    /// Navigation budget as a `Duration`.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Settle budget as a `Duration`.
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagebrief/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PagebriefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pagebrief/pagebrief.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PagebriefError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PagebriefError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PagebriefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PagebriefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PagebriefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the summarizer API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.summarizer.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(PagebriefError::config(format!(
            "summarizer API key not found. Set the {var_name} environment variable."
        ))),
    }
}
