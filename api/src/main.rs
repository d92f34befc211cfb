//! RentFlow API - Main Entry Point

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rentflow_api::{build_router, AppConfig, AppState};
use rentflow_core::MemoryStore;
use rentflow_mpesa::{DarajaClient, Reconciler, ReconciliationQueue};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("RentFlow API v{}", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| rentflow_api::config::DEFAULT_CONFIG_PATH.into());

    let config = AppConfig::load(&config_path)
        .unwrap_or_else(|e| {
            tracing::warn!(path = %config_path, error = %e, "Config not loaded, using defaults");
            AppConfig::default()
        })
        .with_env();
    config.validate().context("refusing to start")?;

    let store = Arc::new(match &config.storage.data_file {
        Some(path) => MemoryStore::load_snapshot(path)
            .await
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => MemoryStore::new(),
    });

    let gateway = Arc::new(DarajaClient::new(config.mpesa.clone()).context("building Daraja client")?);
    let (reconciliation, worker) = ReconciliationQueue::spawn(
        Reconciler::new(store.clone()),
        config.reconciliation.queue_capacity,
    );

    let addr = config.bind_addr();
    let data_file = config.storage.data_file.clone();
    let app = build_router(AppState::new(config, store.clone(), gateway, reconciliation));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("RentFlow API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The router owned every queue handle, so the worker drains and stops
    if tokio::time::timeout(Duration::from_secs(10), worker).await.is_err() {
        tracing::warn!("Reconciliation worker did not drain in time");
    }

    if let Some(path) = data_file {
        store.save_snapshot(&path).await?;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    first_signal(ctrl_c, terminate).await;
}

/// Resolves when either signal fires
async fn first_signal(ctrl_c: impl Future<Output = ()>, terminate: impl Future<Output = ()>) {
    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
    tracing::info!("Shutdown signal received");
}
