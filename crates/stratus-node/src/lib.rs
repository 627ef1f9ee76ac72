//! # Stratus Node
//!
//! Serves git repositories stored in an object store over a JSON API.
//!
//! ```text
//! HTTP (stratus-web) -> plumbing (stratus-git) -> adapter + caches (stratus-storage) -> object store
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin stratus-node -- --listen 127.0.0.1:8080
//! ```
//!
//! ## Modules
//!
//! - [`config`] - YAML configuration with defaults
//! - [`observability`] - Structured logging

pub mod config;
pub mod observability;

use anyhow::Context;
use axum::Router;
use config::{BackendKind, Config, StorageConfig};
use std::sync::Arc;
use stratus_storage::{CacheConfig, CacheLayer, CloudBackend, MemoryBackend, StoreBackend, TimeoutBackend};
use stratus_web::{create_router, AppState, RepoRegistry};
use tracing::info;

/// Connects to the configured object store, bounded by the configured timeout.
pub fn build_backend(storage: &StorageConfig) -> anyhow::Result<Arc<dyn StoreBackend>> {
    let backend: Arc<dyn StoreBackend> = match storage.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::Local => {
            let root = storage
                .root
                .as_ref()
                .context("storage.root is required for the local backend")?;
            Arc::new(CloudBackend::local(root).context("failed to open local object store")?)
        }
        BackendKind::S3 => {
            let bucket = storage
                .bucket
                .as_deref()
                .context("storage.bucket is required for the s3 backend")?;
            Arc::new(
                CloudBackend::s3(bucket, storage.region.as_deref(), storage.endpoint.as_deref())
                    .context("failed to configure S3 object store")?,
            )
        }
    };
    Ok(Arc::new(TimeoutBackend::new(backend, storage.timeout())))
}

/// Builds the shared state: object store, caches and the loaded registry.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let backend = build_backend(&config.storage)?;
    let cache = Arc::new(CacheLayer::new(CacheConfig::from(&config.cache)));
    let registry = RepoRegistry::load(backend.clone())
        .await
        .context("failed to load repository registry")?;

    info!(
        backend = ?config.storage.backend,
        timeout_secs = config.storage.timeout_secs,
        repositories = registry.len(),
        "Storage ready"
    );
    Ok(AppState::new(Arc::new(registry), backend, cache))
}

/// Builds the HTTP application.
pub async fn build_app(config: &Config) -> anyhow::Result<Router> {
    Ok(create_router(build_state(config).await?))
}

/// Serves the API until Ctrl+C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let app = build_app(&config).await?;
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        })
        .await
        .context("server error")
}
