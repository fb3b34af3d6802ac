//! Triad integration test harness.
//!
//! Every test runs a real coordinator and real storage nodes in-process,
//! on ephemeral loopback ports with tempdir-backed storage. Nothing is
//! shared between tests; each builds its own cluster.
//!
//! Several assertions poll briefly: the coordinator finishes part
//! distribution after SEND returns to the client, and finishes part
//! cleanup after RECEIVE's payload has been streamed, so the observable
//! side effects trail the client calls by design.

use std::future::Future;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub use triad_core::partition::{part_name, PART_COUNT};
pub use triad_services::{
    read_timeout, BlobStore, Catalog, Coordinator, CoordinatorClient, NodeClient, NodeServer,
};

mod failures;
mod transfer;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Read timeout for all test servers, in seconds. Short enough that a
/// broken handler fails the test instead of hanging it.
pub const TEST_TIMEOUT_SECS: u64 = 5;

pub struct Cluster {
    pub coordinator_addr: String,
    pub node_addrs: Vec<String>,
    pub coordinator_dir: PathBuf,
    pub node_dirs: Vec<PathBuf>,
    _dirs: Vec<TempDir>,
}

impl Cluster {
    /// Start a coordinator and three live storage nodes.
    pub async fn start() -> Result<Self> {
        Self::start_with([true; PART_COUNT]).await
    }

    /// Start a cluster where only the flagged nodes actually listen.
    /// A down node still has an address (and a storage dir), but nothing
    /// accepts connections there.
    pub async fn start_with(nodes_up: [bool; PART_COUNT]) -> Result<Self> {
        let mut dirs = Vec::new();
        let mut node_addrs = Vec::new();
        let mut node_dirs = Vec::new();

        for up in nodes_up {
            let dir = tempfile::tempdir()?;
            let listener = TcpListener::bind("127.0.0.1:0").await?;
            let addr = listener.local_addr()?.to_string();
            if up {
                let store = BlobStore::new(dir.path().to_path_buf())?;
                let node = Arc::new(NodeServer::new(store, read_timeout(TEST_TIMEOUT_SECS)));
                tokio::spawn(node.serve(listener));
            } else {
                // Keep the address but free the port: connects will be refused.
                drop(listener);
            }
            node_addrs.push(addr);
            node_dirs.push(dir.path().to_path_buf());
            dirs.push(dir);
        }

        let coordinator_tmp = tempfile::tempdir()?;
        let coordinator_dir = coordinator_tmp.path().to_path_buf();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let coordinator_addr = listener.local_addr()?.to_string();
        let nodes: [String; PART_COUNT] = node_addrs.clone().try_into().unwrap();
        let coordinator = Arc::new(Coordinator::new(
            Catalog::new(),
            BlobStore::new(coordinator_dir.clone())?,
            nodes,
            read_timeout(TEST_TIMEOUT_SECS),
        ));
        tokio::spawn(coordinator.serve(listener));
        dirs.push(coordinator_tmp);

        Ok(Self {
            coordinator_addr,
            node_addrs,
            coordinator_dir,
            node_dirs,
            _dirs: dirs,
        })
    }

    pub fn client(&self) -> CoordinatorClient {
        CoordinatorClient::new(self.coordinator_addr.clone())
    }

    pub fn node_client(&self, index: usize) -> NodeClient {
        NodeClient::new(self.node_addrs[index].clone())
    }

    /// Path where part `index` of `file` lands on its node.
    pub fn node_part_path(&self, file: &str, index: usize) -> PathBuf {
        self.node_dirs[index].join(part_name(file, index))
    }

    pub async fn send_bytes(&self, name: &str, data: &[u8]) -> Result<()> {
        let mut reader = Cursor::new(data.to_vec());
        self.client()
            .send(name, data.len() as u64, &mut reader)
            .await
    }

    pub async fn receive_bytes(&self, name: &str) -> Result<Option<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        match self.client().receive(name, &mut out).await? {
            Some((served, _size)) => Ok(Some((served, out))),
            None => Ok(None),
        }
    }
}

/// Poll `cond` until it holds or two seconds elapse. Returns whether it
/// ever held.
pub async fn eventually<F, Fut>(mut cond: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if cond().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
