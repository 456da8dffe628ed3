//! API Service - JSON dashboard over camera site-visit reports
//!
//! Endpoints:
//! - GET  /health       - Health check
//! - POST /upload       - Load a CSV export (replaces the current dataset)
//! - GET  /dataset      - Info about the loaded dataset
//! - GET  /lookups      - Option lists for the filter controls
//! - GET  /records      - Filtered records
//! - GET  /metrics      - Camera totals for a filter
//! - GET  /summary      - Period label and highlights for a filter
//! - GET  /charts       - Chart series for a filter
//! - GET  /dashboard    - All of the above in one response
//! - POST /dashboard    - Same, with a JSON filter (multi-select locations)
//! - GET  /export/name  - Suggested export file name

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use exporter::{report_file_name, ReportFormat};
use parser::{
    apply_filters, build_charts, build_lookups, build_summary, compute_metrics, load_dataset,
    ChartSpec, DashboardView, Dataset, DatasetInfo, FilterState, InputEncoding, LoadOptions,
    Lookups, Metrics, PipelineConfig, Record, Summary,
};

const DEFAULT_RECORD_LIMIT: usize = 100;
const MAX_RECORD_LIMIT: usize = 1000;

// ============================================================================
// Config
// ============================================================================

struct Config {
    bind: String,
    max_upload_bytes: usize,
    pipeline: PipelineConfig,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind: std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            max_upload_bytes: match std::env::var("MAX_UPLOAD_BYTES") {
                Ok(v) => v.trim().parse().context("invalid MAX_UPLOAD_BYTES")?,
                Err(_) => 20 * 1024 * 1024,
            },
            pipeline: PipelineConfig::from_env()?,
        })
    }
}

// ============================================================================
// State
// ============================================================================

/// The loaded dataset is swapped wholesale on upload. Readers clone the
/// `Arc` and compute outside the lock.
struct AppState {
    dataset: RwLock<Option<Arc<Dataset>>>,
    load_options: LoadOptions,
}

impl AppState {
    fn new(load_options: LoadOptions) -> Self {
        Self {
            dataset: RwLock::new(None),
            load_options,
        }
    }

    async fn current(&self) -> Result<Arc<Dataset>, ApiError> {
        self.dataset
            .read()
            .await
            .clone()
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No dataset loaded"))
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
    load_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Serialize)]
struct RecordsResponse {
    total: usize,
    returned: usize,
    records: Vec<Record>,
}

#[derive(Serialize)]
struct ExportNameResponse {
    file_name: String,
}

// ============================================================================
// Query params
// ============================================================================

#[derive(Deserialize)]
struct UploadQuery {
    file_name: Option<String>,
    encoding: Option<String>,
}

/// Single-valued filter parameters. Empty values mean "no constraint".
#[derive(Deserialize, Default)]
struct FilterQuery {
    location: Option<String>,
    supervisor: Option<String>,
    time_of_check: Option<String>,
    operational: Option<String>,
    from: Option<String>,
    to: Option<String>,
    limit: Option<usize>,
}

fn parse_day(value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").map(Some).map_err(|_| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("invalid date '{}', expected YYYY-MM-DD", v),
            )
        }),
    }
}

impl FilterQuery {
    fn to_filters(&self) -> Result<FilterState, ApiError> {
        Ok(FilterState {
            locations: self.location.iter().cloned().collect(),
            supervisor: self.supervisor.clone(),
            time_of_check: self.time_of_check.clone(),
            operational: self.operational.clone(),
            date_from: parse_day(self.from.as_deref())?,
            date_to: parse_day(self.to.as_deref())?,
        })
    }
}

#[derive(Deserialize)]
struct ExportNameQuery {
    location: Option<String>,
    format: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let load_id = state.dataset.read().await.as_ref().map(|ds| ds.load_id);
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        load_id,
    })
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<DatasetInfo>, ApiError> {
    let mut options = state.load_options.clone();
    if let Some(encoding) = params.encoding.as_deref().filter(|e| !e.trim().is_empty()) {
        options.encoding = encoding
            .parse::<InputEncoding>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    }
    let file_name = params
        .file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "upload.csv".to_string());

    // Parse fully before touching the shared slot; a failure keeps the old data.
    let name = file_name.clone();
    let parsed = tokio::task::spawn_blocking(move || load_dataset(&body, &name, &options))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let dataset = match parsed {
        Ok(ds) => Arc::new(ds),
        Err(e) => {
            warn!(file_name = %file_name, error = %e, "upload rejected");
            return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
        }
    };

    let info = dataset.info();
    *state.dataset.write().await = Some(dataset);
    info!(load_id = %info.load_id, records = info.records, "dataset replaced");
    Ok(Json(info))
}

async fn dataset_handler(State(state): State<Arc<AppState>>) -> Result<Json<DatasetInfo>, ApiError> {
    Ok(Json(state.current().await?.info()))
}

async fn lookups_handler(State(state): State<Arc<AppState>>) -> Result<Json<Lookups>, ApiError> {
    let dataset = state.current().await?;
    Ok(Json(build_lookups(&dataset.records)))
}

async fn records_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let filters = params.to_filters()?;
    let dataset = state.current().await?;
    let subset = apply_filters(&dataset.records, &filters);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECORD_LIMIT)
        .clamp(1, MAX_RECORD_LIMIT);

    let records: Vec<Record> = subset.iter().take(limit).map(|r| (*r).clone()).collect();
    Ok(Json(RecordsResponse {
        total: subset.len(),
        returned: records.len(),
        records,
    }))
}

async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Metrics>, ApiError> {
    let filters = params.to_filters()?;
    let dataset = state.current().await?;
    Ok(Json(compute_metrics(apply_filters(&dataset.records, &filters))))
}

async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Summary>, ApiError> {
    let filters = params.to_filters()?;
    let dataset = state.current().await?;
    let subset = apply_filters(&dataset.records, &filters);
    Ok(Json(build_summary(&subset, &filters)))
}

async fn charts_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Vec<ChartSpec>>, ApiError> {
    let filters = params.to_filters()?;
    let dataset = state.current().await?;
    let subset = apply_filters(&dataset.records, &filters);
    let metrics = compute_metrics(subset.iter().copied());
    Ok(Json(build_charts(&subset, &metrics)))
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    let filters = params.to_filters()?;
    let dataset = state.current().await?;
    Ok(Json(DashboardView::build(&dataset.records, &filters)))
}

async fn dashboard_post_handler(
    State(state): State<Arc<AppState>>,
    Json(filters): Json<FilterState>,
) -> Result<Json<DashboardView>, ApiError> {
    let dataset = state.current().await?;
    Ok(Json(DashboardView::build(&dataset.records, &filters)))
}

async fn export_name_handler(
    Query(params): Query<ExportNameQuery>,
) -> Result<Json<ExportNameResponse>, ApiError> {
    let format = match params.format.as_deref() {
        None | Some("") => ReportFormat::Pdf,
        Some(f) => f
            .parse::<ReportFormat>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
    };
    let today = Local::now().date_naive();
    Ok(Json(ExportNameResponse {
        file_name: report_file_name(params.location.as_deref(), today, format),
    }))
}

// ============================================================================
// Router
// ============================================================================

fn app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    // CORS for web frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/dataset", get(dataset_handler))
        .route("/lookups", get(lookups_handler))
        .route("/records", get(records_handler))
        .route("/metrics", get(metrics_handler))
        .route("/summary", get(summary_handler))
        .route("/charts", get(charts_handler))
        .route("/dashboard", get(dashboard_handler).post(dashboard_post_handler))
        .route("/export/name", get(export_name_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let config = Config::from_env()?;

    println!("=== Camera Site-Visit Dashboard API ===");
    println!("Operational policy: {:?}", config.pipeline.policy);
    println!("Input encoding: {}", config.pipeline.encoding);

    let state = Arc::new(AppState::new(config.pipeline.load_options()));
    let app = app(state, config.max_upload_bytes);

    println!("API listening on http://{}", config.bind);
    println!("\nEndpoints:");
    println!("  GET  /health");
    println!("  POST /upload?file_name=&encoding=");
    println!("  GET  /dataset");
    println!("  GET  /lookups");
    println!("  GET  /records?location=&supervisor=&time_of_check=&operational=&from=&to=&limit=");
    println!("  GET  /metrics | /summary | /charts | /dashboard  (same filters)");
    println!("  POST /dashboard");
    println!("  GET  /export/name?location=&format=");

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
