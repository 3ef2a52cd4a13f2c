//! HTTP server for Prometheus metrics endpoint.
//!
//! The listener is bound during startup so a taken port is fatal; serving then
//! runs on a separate tokio task.

use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use rpcd_metrics::CollectorRegistry;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler(State(registry): State<CollectorRegistry>) -> impl IntoResponse {
    let body = crate::telemetry::spans::scrape(registry.len()).in_scope(|| registry.gather_text());
    ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body)
}

/// Router exposing `registry` on `/metrics`.
pub fn router(registry: CollectorRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

/// Bind the metrics listener on `0.0.0.0:port`.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics endpoint on {addr}"))
}

/// Serve `/metrics` on an already bound listener.
///
/// This is a long-running task that should be spawned in the background.
pub async fn run_http_server(listener: TcpListener, registry: CollectorRegistry) {
    let app = router(registry);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("Prometheus HTTP server listening on {}", addr),
        Err(e) => tracing::warn!("Prometheus HTTP server address unknown: {}", e),
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
