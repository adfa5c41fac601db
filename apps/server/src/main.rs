//! pagebrief HTTP server — crawl-and-summarize over one POST endpoint.

mod app;

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagebrief_core::CrawlPipeline;
use pagebrief_render::WebDriverRenderer;
use pagebrief_shared::{CrawlConfig, load_config};
use pagebrief_summarize::OpenAiSummarizer;

use app::{AppState, build_app};

/// pagebrief server — POST a URL, get back a summarized knowledge document.
#[derive(Parser)]
#[command(name = "pagebrief-server", version, about)]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: &LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagebrief=info,tower_http=info"));

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(&args.log_format);

    let config = load_config()?;

    let renderer = WebDriverRenderer::new(config.renderer.clone());
    let summarizer = OpenAiSummarizer::from_config(&config.summarizer)?;
    let pipeline = CrawlPipeline::new(renderer, summarizer, CrawlConfig::from(&config));

    let state = AppState {
        service: Arc::new(pipeline),
    };
    let app = build_app(state);

    let addr = format!("0.0.0.0:{}", args.port);
    info!(%addr, "starting pagebrief server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.wrap_err("server error")?;

    Ok(())
}
