//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use pagebrief_core::{CrawlOutcome, CrawlPipeline, ProgressReporter};
use pagebrief_render::WebDriverRenderer;
use pagebrief_shared::{AppConfig, CrawlConfig, PageSection, init_config, load_config, validate_api_key};
use pagebrief_summarize::OpenAiSummarizer;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pagebrief — crawl a documentation site into one summarized document.
#[derive(Parser)]
#[command(
    name = "pagebrief",
    version,
    about = "Crawl a documentation URL and its linked pages into a single summarized knowledge document.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a URL and its same-site links into a knowledge document.
    Crawl {
        /// Seed URL to crawl (http or https).
        url: String,

        /// Output file path (defaults to the configured knowledge_file).
        #[arg(short, long)]
        out: Option<String>,

        /// WebDriver endpoint (overrides config).
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Summarization model (overrides config).
        #[arg(long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagebrief=info",
        1 => "pagebrief=debug",
        _ => "pagebrief=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            url,
            out,
            webdriver_url,
            model,
        } => cmd_crawl(&url, out, webdriver_url, model).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(
    url: &str,
    out: Option<String>,
    webdriver_url: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let mut config = load_config()?;

    // CLI flags override config file values.
    if let Some(endpoint) = webdriver_url {
        config.renderer.webdriver_url = endpoint;
    }
    if let Some(model) = model {
        config.summarizer.model = model;
    }
    if let Some(path) = out {
        config.output.knowledge_file = path;
    }

    // Validate the API key before any browser or network work.
    validate_api_key(&config)?;

    let crawl_config = CrawlConfig::from(&config);
    let renderer = WebDriverRenderer::new(config.renderer.clone());
    let summarizer = OpenAiSummarizer::from_config(&config.summarizer)?;
    let pipeline = CrawlPipeline::new(renderer, summarizer, crawl_config);

    // Ctrl-C cancels the run; completed sections are kept and the document
    // is still written.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling crawl");
            signal_cancel.cancel();
        }
    });

    info!(url, "starting crawl");

    let reporter = CliProgress::new();
    let outcome = pipeline.run_with(url, cancel, &reporter).await?;

    println!();
    println!("  Knowledge document written!");
    println!("  Source:  {}", outcome.document.source_url);
    println!("  Pages:   {}", outcome.targets.len());
    if outcome.document.failed_count() > 0 {
        println!("  Failed:  {}", outcome.document.failed_count());
    }
    println!("  Output:  {}", outcome.output_path.display());
    println!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn target_finished(&self, section: &PageSection, current: usize, total: usize) {
        let status = if section.is_failed() { " (failed)" } else { "" };
        self.spinner.set_message(format!(
            "Summarizing [{current}/{total}] {}{status}",
            section.target.url
        ));
    }

    fn done(&self, _outcome: &CrawlOutcome) {
        self.spinner.finish_and_clear();
    }
}
