//! Coordinator server — owns the file catalog, partitions inbound files
//! across the three storage nodes, and reassembles them on retrieval.
//!
//! Retrieval is consume-once: a successful RECEIVE removes the name from
//! the catalog and asks each node to drop its part. SEND is deliberately
//! not atomic: the name enters the catalog before distribution, and a
//! node failure during distribution is logged, not rolled back. Both
//! behaviors match the protocol contract and are asserted by the tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use triad_core::partition::{self, PART_COUNT};
use triad_core::wire::{self, Command};

use crate::{timed, BlobStore, Catalog, NodeClient, TimedReader};

/// Scratch blob prefixes. Inbound files buffer under `tmp_`, reassembled
/// files under `asm_`, so neither collides with the `<name>_part<i>`
/// blobs the local DELETE command operates on.
const INBOUND_PREFIX: &str = "tmp_";
const ASSEMBLY_PREFIX: &str = "asm_";

pub struct Coordinator {
    catalog: Catalog,
    scratch: BlobStore,
    nodes: [NodeClient; PART_COUNT],
    read_timeout: Option<Duration>,
}

impl Coordinator {
    pub fn new(
        catalog: Catalog,
        scratch: BlobStore,
        nodes: [String; PART_COUNT],
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            catalog,
            scratch,
            nodes: nodes.map(NodeClient::new),
            read_timeout,
        }
    }

    /// Accept loop: one spawned task per client connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "coordinator listening");
        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .context("coordinator accept failed")?;
            let coordinator = self.clone();
            tokio::spawn(async move {
                if let Err(e) = coordinator.handle(stream).await {
                    tracing::warn!(peer = %peer, error = %e, "connection handler failed");
                }
            });
        }
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<()> {
        let command = timed(self.read_timeout, wire::read_command(&mut stream)).await?;
        match command {
            Command::List => self.handle_list(&mut stream).await?,
            Command::Send => self.handle_send(&mut stream).await?,
            Command::Receive => self.handle_receive(&mut stream).await?,
            Command::Delete => self.handle_delete(&mut stream).await?,
            other => bail!(
                "command {:?} is not valid on the coordinator",
                other.as_tag()
            ),
        }
        stream.shutdown().await.ok();
        Ok(())
    }

    /// LIST: count followed by every catalog name, in no particular order.
    async fn handle_list(&self, stream: &mut TcpStream) -> Result<()> {
        let names = self.catalog.names();
        wire::write_count(stream, names.len() as i32).await?;
        for name in &names {
            wire::write_string(stream, name).await?;
        }
        tracing::info!(count = names.len(), "catalog listed");
        Ok(())
    }

    /// SEND: buffer the file locally, then cut it into three ranges and
    /// push one to each node. The catalog gains the name before any part
    /// moves; a node that cannot be reached costs that one part and a log
    /// line, nothing more.
    async fn handle_send(&self, stream: &mut TcpStream) -> Result<()> {
        let name = timed(self.read_timeout, wire::read_string(stream)).await?;
        let size = timed(self.read_timeout, wire::read_size(stream)).await?;
        if size < 0 {
            bail!("negative SEND size {size} for {name:?}");
        }
        let size = size as u64;

        // Catalog membership is advisory: inserted before distribution.
        self.catalog.insert(&name);

        let inbound = format!("{INBOUND_PREFIX}{name}");
        let mut payload = TimedReader::new(&mut *stream, self.read_timeout);
        if let Err(e) = self.scratch.write_from(&inbound, size, &mut payload).await {
            // Same cleanup as the receive path: a half-buffered inbound
            // blob must not outlive the failed request.
            self.scratch.remove(&inbound).await.ok();
            return Err(e.context(format!("failed to buffer {name:?}")));
        }
        tracing::info!(file = %name, bytes = size, "file buffered");

        for part in partition::split(size) {
            let part_name = partition::part_name(&name, part.index);
            let node = &self.nodes[part.index];
            let result = async {
                let mut range = self
                    .scratch
                    .open_range(&inbound, part.offset, part.len)
                    .await?;
                node.store(&part_name, part.len, &mut range).await
            }
            .await;
            match result {
                Ok(()) => {
                    tracing::info!(part = %part_name, node = node.addr(), bytes = part.len, "part distributed")
                }
                Err(e) => {
                    // No rollback, no retry: the catalog entry stays even
                    // though this part never reached its node.
                    tracing::warn!(part = %part_name, node = node.addr(), error = %e, "failed to distribute part")
                }
            }
        }

        self.scratch.remove(&inbound).await?;
        Ok(())
    }

    /// RECEIVE: not-found for unknown names without touching any node;
    /// otherwise fetch all three parts, stream the reassembled bytes, and
    /// consume the file (catalog entry plus best-effort part deletion).
    async fn handle_receive(&self, stream: &mut TcpStream) -> Result<()> {
        let name = timed(self.read_timeout, wire::read_string(stream)).await?;
        if !self.catalog.contains(&name) {
            wire::write_flag(stream, false).await?;
            tracing::info!(file = %name, "receive of unknown file");
            return Ok(());
        }
        wire::write_flag(stream, true).await?;

        let assembly = format!("{ASSEMBLY_PREFIX}{name}");
        let total = match self.fetch_parts(&name, &assembly).await {
            Ok(total) => total,
            Err(e) => {
                // No partial delivery: drop the half-built assembly and
                // fail this connection. The catalog entry stands.
                self.scratch.remove(&assembly).await.ok();
                return Err(e.context(format!("failed to reassemble {name:?}")));
            }
        };

        wire::write_string(stream, &name).await?;
        wire::write_size(stream, total as i64).await?;
        self.scratch.read_to(&assembly, stream).await?;
        tracing::info!(file = %name, bytes = total, "file served");

        self.scratch.remove(&assembly).await?;
        self.catalog.remove(&name);

        // Best-effort cleanup on the nodes. Failures are logged and never
        // retried; the file is gone from the catalog regardless.
        for (index, node) in self.nodes.iter().enumerate() {
            let part_name = partition::part_name(&name, index);
            match node.delete(&part_name, false).await {
                Ok(ack) => tracing::debug!(part = %part_name, node = node.addr(), ack = %ack, "part cleanup"),
                Err(e) => {
                    tracing::warn!(part = %part_name, node = node.addr(), error = %e, "part cleanup failed")
                }
            }
        }
        Ok(())
    }

    /// Fetch the three parts in index order, appending each to the
    /// assembly blob. Any unreachable node or missing part fails the
    /// whole fetch.
    async fn fetch_parts(&self, name: &str, assembly: &str) -> Result<u64> {
        // A stale assembly from an earlier failed receive would otherwise
        // be prepended by append_from.
        self.scratch.remove(assembly).await?;

        let mut total = 0u64;
        for (index, node) in self.nodes.iter().enumerate() {
            let part_name = partition::part_name(name, index);
            let Some((len, stream)) = node
                .retrieve(&part_name)
                .await
                .with_context(|| format!("node {} unreachable", node.addr()))?
            else {
                bail!("node {} has no part {part_name:?}", node.addr());
            };
            let mut payload = TimedReader::new(stream, self.read_timeout);
            self.scratch
                .append_from(assembly, len, &mut payload)
                .await
                .with_context(|| format!("failed to fetch part {part_name:?}"))?;
            tracing::debug!(part = %part_name, node = node.addr(), bytes = len, "part fetched");
            total += len;
        }
        Ok(total)
    }

    /// DELETE: removes the file's part blobs from the coordinator's own
    /// storage directory. This deliberately does not forward to the
    /// storage nodes and does not touch the catalog; only RECEIVE's
    /// cleanup path talks to the nodes.
    async fn handle_delete(&self, stream: &mut TcpStream) -> Result<()> {
        let name = timed(self.read_timeout, wire::read_string(stream)).await?;
        let mut all_removed = true;
        for index in 0..PART_COUNT {
            let part_name = partition::part_name(&name, index);
            match self.scratch.remove(&part_name).await {
                Ok(true) => tracing::info!(part = %part_name, "local part removed"),
                Ok(false) => tracing::info!(part = %part_name, "local part not found"),
                Err(e) => {
                    tracing::warn!(part = %part_name, error = %e, "failed to remove local part");
                    all_removed = false;
                }
            }
        }
        let ack = if all_removed {
            "parts deleted"
        } else {
            "failed to delete some parts"
        };
        wire::write_string(stream, ack).await?;
        Ok(())
    }
}
