//! AIC Consortium - HTTP node for the identity ledger
//!
//! A node signs consensus tids, resolves PIDs to their current documents,
//! and accepts genesis registrations and signed diffs. State lives in a
//! [`TickStore`](aic_store::TickStore); concurrent writers on the same store
//! are ordered by its compare-and-swap.

#![forbid(unsafe_code)]

/// Node configuration
pub mod config;

/// HTTP routes
pub mod routes;

/// Request handling
pub mod service;

pub use config::ConsortiumConfig;
pub use routes::{router, status_for, ApiError};
pub use service::{ConsortiumService, Resolution};

use aic_core::TidClock;
use aic_ledger::LedgerEngine;
use aic_store::{MemoryTickStore, SqliteTickStore, TickStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `verbose`, which wins over `default_filter`.
pub fn init_tracing(verbose: bool, default_filter: &str) {
    let fallback = if verbose { "debug" } else { default_filter };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the node described by `config`
pub fn build_service(config: &ConsortiumConfig) -> Result<ConsortiumService> {
    let keypair = config.keypair().context("loading consortium key")?;
    let engine = LedgerEngine::new(keypair)
        .with_envelope(aic_core::SignatureEnvelope::new(config.canonical_form))
        .with_policy(config.authorization.build());

    let store: Arc<dyn TickStore> = match &config.database {
        Some(path) => Arc::new(
            SqliteTickStore::open(path)
                .with_context(|| format!("opening tick store {}", path.display()))?,
        ),
        None => {
            tracing::warn!("no database configured, ticks are kept in memory");
            Arc::new(MemoryTickStore::new())
        }
    };

    Ok(ConsortiumService::new(engine, store, TidClock::system()))
}

/// Serve the node until ctrl-c
pub async fn serve(config: &ConsortiumConfig) -> Result<()> {
    let addr = config.listen_addr()?;
    let service = build_service(config)?;
    tracing::info!(
        %addr,
        consortium = %service.engine().consortium_did(),
        form = ?config.canonical_form,
        policy = ?config.authorization,
        "consortium node starting"
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("consortium node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
