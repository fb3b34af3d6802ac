//! triad-node — Triad storage node daemon.
//!
//! Holds one directory of part blobs and answers STORE, RETRIEVE, and
//! DELETE from the coordinator. Nodes never initiate connections and
//! know nothing about each other.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use triad_core::config::TriadConfig;
use triad_services::{read_timeout, BlobStore, NodeServer};

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

    tracing::info!(
        addr = %config.node.listen_addr,
        storage = %config.node.storage_dir.display(),
        "triad-node starting"
    );

    let store = BlobStore::new(config.node.storage_dir.clone())?;
    let node = Arc::new(NodeServer::new(
        store,
        read_timeout(config.node.read_timeout_secs),
    ));

    let listener = TcpListener::bind(&config.node.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.node.listen_addr))?;

    let server_task = tokio::spawn(node.serve(listener));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        r = server_task            => tracing::error!("storage node exited: {:?}", r),
    }

    Ok(())
}
