use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use crate::ptz::tracker::StatusTracker;
use crate::server::routes::{create_router, AppState};

pub async fn start_server(listen_addr: String, state: AppState) -> Result<()> {
    let addr: SocketAddr = listen_addr.parse().context("failed to parse listen address")?;
    let tracker = state.interceptor.tracker().clone();

    let app = create_router(state).layer(TraceLayer::new_for_http());

    tracing::info!("starting ONVIF PTZ proxy on {addr}");
    tracing::info!("PTZ endpoint at /onvif/ptz, device/media/imaging/events forwarded transparently");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to listen address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tracker))
        .await
        .context("server error")?;

    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or, on unix, SIGTERM, then cancels every
/// outstanding auto-idle timer before the server finishes draining.
async fn shutdown_signal(tracker: StatusTracker) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, cancelling outstanding PTZ timers");
    tracker.cleanup().await;
}
