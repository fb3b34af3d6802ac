//! Storage node server — owns one directory of part blobs and answers
//! STORE / RETRIEVE / DELETE on behalf of the coordinator.
//!
//! Each accepted connection is handled by its own task; connections share
//! nothing but the filesystem. A node has no catalog and no awareness of
//! the other nodes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use triad_core::wire::{self, Command, NOT_FOUND_SIZE};

use crate::{timed, BlobStore, TimedReader};

pub struct NodeServer {
    store: BlobStore,
    read_timeout: Option<Duration>,
}

impl NodeServer {
    pub fn new(store: BlobStore, read_timeout: Option<Duration>) -> Self {
        Self {
            store,
            read_timeout,
        }
    }

    /// Accept loop. Never blocks on a connection: each one is served by a
    /// spawned task, and a handler failure is fatal only to that task.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, root = %self.store.root().display(), "storage node listening");
        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .context("storage node accept failed")?;
            let node = self.clone();
            tokio::spawn(async move {
                if let Err(e) = node.handle(stream).await {
                    tracing::warn!(peer = %peer, error = %e, "connection handler failed");
                }
            });
        }
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<()> {
        let command = timed(self.read_timeout, wire::read_command(&mut stream)).await?;
        match command {
            Command::Store => self.handle_store(&mut stream).await?,
            Command::Retrieve => self.handle_retrieve(&mut stream).await?,
            Command::Delete => self.handle_delete(&mut stream).await?,
            other => bail!("command {:?} is not valid on a storage node", other.as_tag()),
        }
        stream.shutdown().await.ok();
        Ok(())
    }

    /// STORE: name, size, payload. Overwrites any blob of the same name.
    /// Sends no response; a filesystem failure kills this connection only.
    async fn handle_store(&self, stream: &mut TcpStream) -> Result<()> {
        let name = timed(self.read_timeout, wire::read_string(stream)).await?;
        let size = timed(self.read_timeout, wire::read_size(stream)).await?;
        if size < 0 {
            bail!("negative STORE size {size} for {name:?}");
        }
        // Stall-bounded, not total-time-bounded: a large payload may take
        // longer than the read timeout as long as bytes keep arriving.
        let mut payload = TimedReader::new(&mut *stream, self.read_timeout);
        self.store.write_from(&name, size as u64, &mut payload).await?;
        tracing::info!(part = %name, bytes = size, "part stored");
        Ok(())
    }

    /// RETRIEVE: replies with the blob size and contents, or the
    /// [`NOT_FOUND_SIZE`] sentinel and nothing else when the name is
    /// unknown. The sentinel gives the coordinator a deterministic
    /// missing-part signal instead of a hang.
    async fn handle_retrieve(&self, stream: &mut TcpStream) -> Result<()> {
        let name = timed(self.read_timeout, wire::read_string(stream)).await?;
        match self.store.size_of(&name).await? {
            Some(len) => {
                wire::write_size(stream, len as i64).await?;
                self.store.read_to(&name, stream).await?;
                tracing::info!(part = %name, bytes = len, "part sent");
            }
            None => {
                wire::write_size(stream, NOT_FOUND_SIZE).await?;
                tracing::info!(part = %name, "part not found");
            }
        }
        Ok(())
    }

    /// DELETE: name plus a prefix flag. Exact mode removes one blob;
    /// prefix mode removes every blob starting with the base name. Always
    /// answers with an ack string, never fails the connection over a
    /// missing blob.
    async fn handle_delete(&self, stream: &mut TcpStream) -> Result<()> {
        let name = timed(self.read_timeout, wire::read_string(stream)).await?;
        let prefix = timed(self.read_timeout, wire::read_flag(stream)).await?;
        let ack = if prefix {
            let outcome = self.store.remove_prefix(&name).await?;
            tracing::info!(base = %name, outcome = ?outcome, "prefix purge");
            outcome.ack()
        } else if self.store.remove(&name).await? {
            tracing::info!(part = %name, "part removed");
            "part removed"
        } else {
            tracing::info!(part = %name, "part not found for delete");
            "part not found"
        };
        wire::write_string(stream, ack).await?;
        Ok(())
    }
}
