//! Herald Server: real-time notification delivery.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use herald_api::{AppState, build_router};
use herald_core::AppError;
use herald_core::config::AppConfig;
use herald_database::StoreManager;
use herald_delivery::{ChannelRegistry, DeliveryRunner};
use herald_realtime::Hub;
use herald_service::{RetentionQueue, RetentionWorker};
use herald_worker::jobs::{DeliveryPurgeTask, DeliveryRecoveryTask, NotificationRetentionTask};
use herald_worker::{CronScheduler, TaskExecutor};

#[tokio::main]
async fn main() {
    let env = std::env::var("HERALD_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Herald v{}", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(config);

    // ── Step 1: Persistence ──────────────────────────────────────
    tracing::info!(provider = %config.database.provider, "Initializing stores...");
    let stores = Arc::new(StoreManager::new(&config.database).await?);

    // ── Step 2: Connection hub ───────────────────────────────────
    let hub = Arc::new(Hub::new(config.realtime.clone()));
    hub.start();

    // ── Step 3: Channel transports ───────────────────────────────
    let channels = Arc::new(ChannelRegistry::from_config(&config.channels)?);
    tracing::info!(channels = ?channels.channels(), "Channel senders registered");

    // ── Step 4: Services ─────────────────────────────────────────
    let (retention, retention_rx) =
        RetentionQueue::channel(config.notifications.retention_queue_size);
    let state = AppState::new(
        Arc::clone(&config),
        Arc::clone(&stores),
        Arc::clone(&hub),
        Arc::clone(&channels),
        retention,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Background workers ───────────────────────────────
    let retention_worker = RetentionWorker::new(
        retention_rx,
        stores.notifications(),
        config.notifications.max_per_recipient,
    );
    let retention_handle = tokio::spawn(retention_worker.run(shutdown_rx.clone()));

    let runner_handle = if config.delivery.enabled {
        let runner = DeliveryRunner::new(Arc::clone(&state.queue), Arc::clone(&channels));
        let cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move { runner.run(cancel).await }))
    } else {
        tracing::info!("Delivery runner disabled");
        None
    };

    // ── Step 6: Scheduled maintenance ────────────────────────────
    let mut executor = TaskExecutor::new();
    executor.register(Arc::new(NotificationRetentionTask::new(Arc::clone(
        &state.notifications,
    ))));
    executor.register(Arc::new(DeliveryRecoveryTask::new(Arc::clone(&state.queue))));
    executor.register(Arc::new(DeliveryPurgeTask::new(Arc::clone(&state.queue))));

    let mut scheduler = CronScheduler::new(Arc::new(executor)).await?;
    scheduler
        .register_default_tasks(&config.notifications.sweep_schedule)
        .await?;
    scheduler.start().await?;

    // ── Step 7: HTTP server ──────────────────────────────────────
    let app = build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Herald server listening on {}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 8: Drain background tasks ───────────────────────────
    tracing::info!("Waiting for background tasks to complete...");
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    hub.shutdown().await;

    if let Some(handle) = runner_handle {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Delivery runner did not stop within the grace period");
        }
    }
    if tokio::time::timeout(grace, retention_handle).await.is_err() {
        tracing::warn!("Retention worker did not stop within the grace period");
    }
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }

    stores.close().await;

    tracing::info!("Herald server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
