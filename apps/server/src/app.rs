//! Router, shared state, and request handlers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use pagebrief_core::CrawlService;
use pagebrief_shared::PagebriefError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn CrawlService>,
}

/// Build the application router.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/crawl", post(crawl_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request/response bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CrawlRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize)]
pub struct CrawlResponse {
    pub message: String,
    pub urls: Vec<CrawledUrl>,
}

#[derive(Serialize)]
pub struct CrawledUrl {
    pub url: String,
    pub text: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// One crawl invocation per request. Invalid or missing URLs are 400 before
/// any I/O; pipeline and persistence failures are 500. Partial crawls (some
/// sections failed) are still 200 — the failures are recorded inside the
/// document itself.
pub async fn crawl_handler(
    State(state): State<AppState>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid request body",
                rejection.body_text(),
                String::new(),
            );
        }
    };

    info!(url = %request.url, "crawl requested");

    match state.service.crawl(&request.url).await {
        Ok(outcome) => {
            let urls: Vec<CrawledUrl> = outcome
                .targets
                .iter()
                .map(|t| CrawledUrl {
                    url: t.url.to_string(),
                    text: t.label.clone(),
                })
                .collect();

            let failed = outcome.document.failed_count();
            let message = if failed == 0 {
                format!("Crawl completed: {} pages processed", urls.len())
            } else {
                format!(
                    "Crawl completed: {} pages processed, {failed} failed",
                    urls.len()
                )
            };

            (StatusCode::OK, Json(CrawlResponse { message, urls })).into_response()
        }
        Err(e) => {
            error!(url = %request.url, error = %e, "crawl failed");
            let status = match &e {
                PagebriefError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, "crawl failed", e.to_string(), request.url)
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    message: impl Into<String>,
    url: String,
) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            message: message.into(),
            url,
        }),
    )
        .into_response()
}
