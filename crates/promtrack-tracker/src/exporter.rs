//! HTTP exporter.
//!
//! Single method-agnostic route: every request, whatever its path or method,
//! gets the registry rendered in the text exposition format. Responses carry
//! `Connection: close` so no connection outlives a scrape.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use promtrack_core::error::{MetricsError, Result};
use promtrack_core::exposition::CONTENT_TYPE;
use promtrack_core::MetricRegistry;

pub fn build_router(registry: Arc<MetricRegistry>) -> Router {
    Router::new().fallback(scrape).with_state(registry)
}

pub async fn scrape(State(registry): State<Arc<MetricRegistry>>) -> Response {
    let body = registry.render();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CONNECTION, "close"),
        ],
        body,
    )
        .into_response()
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| MetricsError::Internal(format!("bind {addr} failed: {e}")))
}

/// Serve scrapes on an already bound listener until the task is aborted.
pub fn serve(listener: TcpListener, registry: Arc<MetricRegistry>) -> JoinHandle<()> {
    let app = build_router(registry);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics exporter stopped");
        }
    })
}
