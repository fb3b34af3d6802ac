//! triadd — Triad coordinator daemon.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpListener;

use triad_core::config::TriadConfig;
use triad_core::partition::PART_COUNT;
use triad_services::{read_timeout, BlobStore, Catalog, Coordinator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = TriadConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TriadConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TriadConfig::default()
    });
    config.coordinator.validate()?;
    let nodes: [String; PART_COUNT] = config
        .coordinator
        .storage_nodes
        .clone()
        .try_into()
        .map_err(|_| anyhow!("expected exactly {PART_COUNT} storage nodes"))?;

    tracing::info!(
        addr = %config.coordinator.listen_addr,
        nodes = ?config.coordinator.storage_nodes,
        storage = %config.coordinator.storage_dir.display(),
        "triadd starting"
    );

    // The catalog lives for the process and starts empty on every boot.
    let catalog = Catalog::new();
    let scratch = BlobStore::new(config.coordinator.storage_dir.clone())?;
    let coordinator = Arc::new(Coordinator::new(
        catalog,
        scratch,
        nodes,
        read_timeout(config.coordinator.read_timeout_secs),
    ));

    let listener = TcpListener::bind(&config.coordinator.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.coordinator.listen_addr))?;

    let server_task = tokio::spawn(coordinator.serve(listener));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        r = server_task            => tracing::error!("coordinator exited: {:?}", r),
    }

    Ok(())
}
