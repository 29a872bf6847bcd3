use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::scope::Scope;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Serve `/health` on `listener` until `scope` is cancelled.
pub async fn serve_on(listener: TcpListener, scope: Scope) -> Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            scope.done().await;
        })
        .await
        .context("Health server error")
}

/// Bind `0.0.0.0:<port>` and serve. Failures are logged; the bot keeps running.
pub async fn run(port: u16, scope: Scope) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind health endpoint on {}: {}", addr, e);
            return;
        }
    };

    info!("Health endpoint listening on http://{}/health", addr);
    if let Err(e) = serve_on(listener, scope).await {
        error!("{:#}", e);
    }
}
