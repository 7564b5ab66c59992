//! JSON HTTP API for the dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/upload-csv` | Reconcile a batch of parsed CSV rows |
//! | `GET`  | `/api/leads` | Browse leads |
//! | `GET`  | `/api/incomplete-leads` | Browse incomplete leads |
//! | `GET`  | `/api/companies` | Browse companies |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Browse endpoints take `search`, `sort`, `order`, `page`, `size` and any
//! number of `filter[<key>]=<value>` query parameters.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid sort key: 'shoeSize'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the dashboard is served
//! from a different origin.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use leadsync_core::attr::Attribute;
use leadsync_core::browse::{browse, BrowseQuery, Page, SortOrder};
use leadsync_core::outcome::BatchResult;
use leadsync_core::store::{Collection, Store};
use leadsync_core::{process_batch, FieldMappings, RawRow};

use crate::config::{validate_mappings, Config};
use crate::db;
use crate::ingest::{resolve_mappings, UploadSummary};
use crate::migrate;
use crate::sqlite_store::SqliteStore;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    /// Mappings from the config file; request mappings are laid over them.
    mappings: Arc<FieldMappings>,
    /// Held for the whole of an upload so two uploads never interleave
    /// their find-then-write sequences.
    upload_lock: Arc<Mutex<()>>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let state = AppState {
        store: Arc::new(SqliteStore::new(pool)),
        mappings: Arc::new(config.mappings.clone()),
        upload_lock: Arc::new(Mutex::new(())),
    };

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("leadsync server listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/upload-csv", post(handle_upload))
        .route("/api/leads", get(handle_leads))
        .route("/api/incomplete-leads", get(handle_incomplete_leads))
        .route("/api/companies", get(handle_companies))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /api/upload-csv ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    csv_data: Vec<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    field_mappings: FieldMappings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(flatten)]
    result: BatchResult,
    summary: UploadSummary,
}

/// Client-side CSV parsers may hand over numbers or nulls; cells are text.
fn to_raw_row(cells: HashMap<String, serde_json::Value>) -> RawRow {
    cells
        .into_iter()
        .filter_map(|(header, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((header, s)),
            other => Some((header, other.to_string())),
        })
        .collect()
}

async fn handle_upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;
    validate_mappings(&request.field_mappings).map_err(|e| bad_request(e.to_string()))?;

    let rows: Vec<RawRow> = request.csv_data.into_iter().map(to_raw_row).collect();
    let headers: Vec<String> = rows
        .iter()
        .flat_map(|row| row.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mappings = resolve_mappings(&state.mappings, Some(&request.field_mappings), &headers);

    let _guard = state.upload_lock.lock().await;
    let result = process_batch(state.store.as_ref(), &rows, &mappings, Utc::now()).await;

    let summary = UploadSummary::of(&result);
    tracing::info!(
        rows = rows.len(),
        leads_created = summary.leads.created,
        leads_updated = summary.leads.updated,
        lead_errors = summary.leads.errors,
        "upload processed"
    );

    Ok(Json(UploadResponse { result, summary }))
}

// ============ GET /api/{leads,incomplete-leads,companies} ============

/// Build a [`BrowseQuery`] from raw query-string pairs.
fn parse_browse_query(params: &[(String, String)]) -> Result<BrowseQuery, AppError> {
    let mut query = BrowseQuery::default();
    for (key, value) in params {
        match key.as_str() {
            "search" => query.search = Some(value.clone()),
            "sort" => query.sort = Some(value.clone()),
            "order" if value.is_empty() => {}
            "order" => {
                query.order = value
                    .parse::<SortOrder>()
                    .map_err(|e| bad_request(e.to_string()))?
            }
            "page" => {
                query.page = value
                    .parse()
                    .map_err(|_| bad_request(format!("invalid page: '{}'", value)))?
            }
            "size" => {
                query.size = value
                    .parse()
                    .map_err(|_| bad_request(format!("invalid size: '{}'", value)))?
            }
            other => {
                if let Some(field) = other
                    .strip_prefix("filter[")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    query.filters.push((field.to_string(), value.clone()));
                }
            }
        }
    }
    Ok(query)
}

async fn page_of<A: Attribute>(
    collection: &dyn Collection<A>,
    params: &[(String, String)],
) -> Result<Json<Page>, AppError> {
    let query = parse_browse_query(params)?;
    let records = collection.list().await.map_err(internal)?;
    let page = browse(records, &query, Utc::now()).map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(page))
}

async fn handle_leads(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Page>, AppError> {
    page_of(state.store.leads(), &params).await
}

async fn handle_incomplete_leads(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Page>, AppError> {
    page_of(state.store.incomplete_leads(), &params).await
}

async fn handle_companies(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Page>, AppError> {
    page_of(state.store.companies(), &params).await
}
