//! HTTP API.
//!
//! Every failure is rendered as `{"error": message}` and nothing else. An
//! empty filtered result is an expected outcome and keeps status 200.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::PaginationConfig;
use crate::error::ExplorerError;
use crate::metrics::MetricsCollector;
use crate::models::{AggregateResult, ChatResponse, FilterOptions, TablePage};
use crate::service::AnalyticsService;
use crate::validation::RawQueryParams;

/// Shared state for the request handlers
#[derive(Clone)]
pub struct AppState {
    /// Analytics over the admissions store
    pub service: Arc<AnalyticsService>,
    /// Paging defaults and limits for the table endpoint
    pub pagination: PaginationConfig,
}

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    chat_configured: bool,
}

impl ExplorerError {
    /// HTTP status the error is reported with
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NoMatchingData => StatusCode::OK,
            Self::Validation(_) | Self::RejectedStatement(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnconfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExplorerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_expected() {
            error!(kind = self.kind(), error = %self, "Request failed");
            MetricsCollector::default().record_error(self.kind(), "http");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ExplorerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ExplorerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, ExplorerError>;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/data", get(data))
        .route("/api/table", get(table))
        .route("/api/filters", get(filters))
        .route("/api/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router on `bind_address` until the process is stopped
pub async fn serve(state: AppState, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "Admissions explorer listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        chat_configured: state.service.chat_configured(),
    })
}

async fn data(
    State(state): State<AppState>,
    params: Result<Query<RawQueryParams>, QueryRejection>,
) -> ApiResult<AggregateResult> {
    let Query(params) = params?;
    let summary = state.service.summary(params.filters()?).await?;
    Ok(Json(summary))
}

async fn table(
    State(state): State<AppState>,
    params: Result<Query<RawQueryParams>, QueryRejection>,
) -> ApiResult<TablePage> {
    let Query(params) = params?;
    let filters = params.filters()?;
    let page = params.page(&state.pagination)?;
    Ok(Json(state.service.table_page(filters, page).await?))
}

async fn filters(State(state): State<AppState>) -> ApiResult<FilterOptions> {
    Ok(Json(state.service.filter_options().await?))
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(request) = body?;
    let exchange = state.service.ask(&request.question).await?;
    Ok(Json(exchange.into()))
}
