// src/bin/worker.rs
// Worker binary: runs the dispatcher's job-kind drain loops against the
// shared cache-backed queue. Stateless relative to the HTTP server — the two
// processes communicate only through the cache store (spec §5's "two
// sibling processes" model).

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meigo::config::CONFIG;
use meigo::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(CONFIG.logging.level.clone())).init();

    if let Err(e) = run().await {
        error!(error = %e, "worker exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let state = AppState::new().await?;
    let dispatcher = state.build_dispatcher();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    info!("dispatcher worker pool starting");

    let run_handle = tokio::spawn(dispatcher.run(shutdown_rx));

    shutdown_signal().await;
    info!("shutdown signal received, draining in-flight jobs");
    let _ = shutdown_tx.send(true);
    run_handle.await?;

    info!("worker shut down gracefully");
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
}
