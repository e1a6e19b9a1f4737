mod api;
mod config;
mod engine;
mod error;
mod models;
mod observability;
mod queue;
mod state;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::engine::state::FileStateStore;
use crate::engine::worker::Worker;
use crate::storage::MemoryDirectory;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let directory: Arc<dyn storage::Directory> = Arc::new(MemoryDirectory::new());
    let order_queue = queue::from_config(&config, directory.clone()).await?;
    let shared_state = Arc::new(state::AppState::new(directory, order_queue));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = Worker::new(
        shared_state.clone(),
        Arc::new(FileStateStore::new(config.worker_state_path.clone())),
        Duration::from_secs(config.poll_interval_secs),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    // Let the worker finish its in-flight cycle before exiting.
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
