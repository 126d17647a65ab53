//! HTTP handlers for the log endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{ConnectInfo, OriginalUri, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::routing::get;
use chrono::{DateTime, Utc};
use reqlog_core::{EventId, LogStats, LogStore, LoggedEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::ingress;
use crate::query::filter_from_pairs;

/// State shared by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<LogStore>,
    /// Bodies larger than this are recorded as undecodable
    pub body_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<LogStore>, body_limit: usize) -> Self {
        Self { store, body_limit }
    }
}

/// Response to a successful submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    pub success: bool,
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub is_email: bool,
    pub is_scraper: bool,
}

/// Response to a log query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub requests: Vec<LoggedEvent>,
    pub total: usize,
}

/// Response to clearing the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub cleared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub events: usize,
}

/// Log routes; served at the root and again under `/api`
pub fn log_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/log",
            get(query_events)
                .post(append_event)
                .put(append_event)
                .patch(append_event)
                .delete(clear_events),
        )
        .route("/log/stats", get(log_stats))
        .route("/log/{id}", get(get_event))
}

/// All application routes, without middleware
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(log_routes())
        .nest("/api", log_routes())
        .route("/health", get(health))
}

/// POST/PUT/PATCH: capture the request as a logged event
///
/// Bodies that cannot be read or decoded are stored as empty events.
pub async fn append_event(
    State(state): State<AppState>,
    request: Request,
) -> (StatusCode, Json<AppendResponse>) {
    let (parts, body) = request.into_parts();
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    // Routes nested under `/api` see a stripped path
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or(&parts.uri);
    let meta = ingress::request_meta(&parts.method, uri, &parts.headers, peer);

    let raw_body = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => ingress::decode_body(&bytes),
        Err(e) => {
            debug!(error = %e, limit = state.body_limit, "Could not read body, storing as empty");
            None
        }
    };

    let event = state.store.append(raw_body, meta);
    info!(
        id = %event.id,
        method = %event.method,
        is_email = event.is_email,
        is_scraper = event.is_scraper,
        "Logged event"
    );

    let response = AppendResponse {
        success: true,
        id: event.id,
        timestamp: event.received_at,
        is_email: event.is_email,
        is_scraper: event.is_scraper,
    };
    (StatusCode::CREATED, Json(response))
}

/// GET: filtered events, newest first
pub async fn query_events(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<QueryResponse> {
    let filter = filter_from_pairs(&pairs);
    let requests = state.store.query(&filter);
    debug!(matched = requests.len(), filtered = !filter.is_empty(), "Queried log");

    Json(QueryResponse {
        total: requests.len(),
        requests,
    })
}

/// DELETE: remove every event
pub async fn clear_events(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.store.clear();
    info!(cleared, "Cleared log");
    Json(ClearResponse {
        success: true,
        cleared,
    })
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LoggedEvent>, ApiError> {
    state
        .store
        .get(&EventId::from_string(id.as_str()))
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

pub async fn log_stats(State(state): State<AppState>) -> Json<LogStats> {
    Json(state.store.stats())
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        events: state.store.len(),
    })
}
