use anyhow::{Context, Result};
use axum::Router;
use std::future::IntoFuture;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long a server may keep draining connections after shutdown begins.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Serve an axum router until the token is cancelled, then shut down
/// gracefully within a bounded grace period. Bind failures are fatal.
pub async fn serve(router: Router, port: u16, ctx: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {port}"))?;

    info!(port = port, "HTTP server listening");

    let shutdown_token = ctx.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .into_future();

    tokio::select! {
        result = server => {
            result.context("HTTP server error")?;
        }
        _ = async {
            ctx.cancelled().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "HTTP server exceeded shutdown grace period");
        }
    }

    info!(port = port, "HTTP server stopped");
    Ok(())
}
