//! # Reqlog Server
//!
//! HTTP collector in front of the [`reqlog_core::LogStore`].
//!
//! | Route | Effect |
//! |-------|--------|
//! | `POST /log` (`PUT`, `PATCH`) | capture the request, `201 {success, id, timestamp, isEmail, isScraper}` |
//! | `GET /log?<filters>` | `{requests, total}`, newest first |
//! | `DELETE /log` | `{success, cleared}` |
//! | `GET /log/stats` | counts by shape |
//! | `GET /log/{id}` | one event |
//! | `GET /health` | liveness |
//!
//! Every `/log` route is also served under `/api`.

pub mod config;
pub mod error;
pub mod ingress;
pub mod query;
pub mod routes;

pub use config::{Cli, ServerConfig};
pub use error::{ApiError, ConfigError, ServerError};
pub use routes::AppState;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use reqlog_core::{CAPACITY, LogStore};
use reqlog_logging::RequestContext;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, info, info_span, warn};

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// W3C trace context header, read on the way in and set on the way out
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Build the full application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    with_middleware(routes::routes().with_state(state), config)
}

/// Wrap a router with request correlation, panic handling and CORS
///
/// Every response carries `x-request-id` and a `traceparent` naming the
/// server-side span.
pub fn with_middleware(router: Router, config: &ServerConfig) -> Router {
    let router = router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(request_context));

    if config.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Run the server until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let state = AppState::new(Arc::new(LogStore::new()), config.body_limit);
    let app = router(state, &config);

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    info!(addr = %config.bind, capacity = CAPACITY, cors = config.cors, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Run each request inside a span tagged with its correlation ids
async fn request_context(request: Request, next: Next) -> Response {
    let headers = request.headers();
    let ctx = RequestContext::from_headers(
        ingress::header_str(headers, TRACEPARENT_HEADER),
        ingress::header_str(headers, REQUEST_ID_HEADER),
    );

    let span = info_span!(
        "request",
        request_id = %ctx.request_id,
        trace_id = %ctx.trace_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Handled request"
        );
    });

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(ctx.request_id_str()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&ctx.to_traceparent()) {
        headers.insert(TRACEPARENT_HEADER, value);
    }
    response
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
