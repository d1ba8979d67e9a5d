//! Serve command - runs the dashboard until interrupted.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::dashboard;
use crate::service::PredictionService;

/// Runs the dashboard server on `addr`.
///
/// # Errors
///
/// Returns an error if the templates do not compile, the address cannot be
/// bound, or the server fails.
pub async fn run(service: PredictionService, addr: SocketAddr) -> Result<()> {
    let app = dashboard::router(service).context("Failed to compile dashboard templates")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Dashboard server error")?;

    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        core::future::pending::<()>().await;
    }
}
