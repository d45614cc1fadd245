// src/main.rs
// HTTP server binary: serves the gateway's external interface (spec §6).
// Job dispatch runs in the sibling `worker` binary (see bin/worker.rs); this
// process only ever enqueues.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meigo::api::build_router;
use meigo::config::CONFIG;
use meigo::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(CONFIG.logging.level.clone())).init();

    if let Err(e) = run().await {
        error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let state = Arc::new(AppState::new().await?);
    let router = build_router(state);

    let bind_address = CONFIG.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(%bind_address, "gateway http server listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    info!("gateway http server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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

    info!("shutdown signal received");
}
