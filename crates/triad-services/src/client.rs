//! Wire clients. One fresh connection per call; there are no sessions.
//!
//! `NodeClient` speaks the coordinator↔node side of the protocol and is
//! also what the integration tests use to inspect individual nodes.
//! `CoordinatorClient` speaks the client↔coordinator side and backs the
//! `triad-ctl` binary.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use triad_core::wire::{self, Command};

async fn connect(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))
}

// ── Storage node client ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct NodeClient {
    addr: String,
}

impl NodeClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// STORE a part: streams `len` bytes from `reader` to the node.
    /// The node sends no response.
    pub async fn store<R>(&self, name: &str, len: u64, reader: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::Store).await?;
        wire::write_string(&mut stream, name).await?;
        wire::write_size(&mut stream, len as i64).await?;
        wire::copy_payload(reader, &mut stream, len).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// RETRIEVE a part. Returns the part size and the stream positioned
    /// at the first payload byte, or `None` when the node reports the
    /// part missing via the sentinel size.
    pub async fn retrieve(&self, name: &str) -> Result<Option<(u64, TcpStream)>> {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::Retrieve).await?;
        wire::write_string(&mut stream, name).await?;
        let size = wire::read_size(&mut stream).await?;
        if size < 0 {
            return Ok(None);
        }
        Ok(Some((size as u64, stream)))
    }

    /// DELETE by exact name (`prefix = false`) or by name prefix
    /// (`prefix = true`). Returns the node's ack string.
    pub async fn delete(&self, name: &str, prefix: bool) -> Result<String> {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::Delete).await?;
        wire::write_string(&mut stream, name).await?;
        wire::write_flag(&mut stream, prefix).await?;
        Ok(wire::read_string(&mut stream).await?)
    }
}

// ── Coordinator client ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct CoordinatorClient {
    addr: String,
}

impl CoordinatorClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// LIST the catalog. Order is not meaningful.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::List).await?;
        let count = wire::read_count(&mut stream).await?;
        if count < 0 {
            bail!("coordinator sent negative list count {count}");
        }
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            names.push(wire::read_string(&mut stream).await?);
        }
        Ok(names)
    }

    /// SEND a file: name, size, then `len` payload bytes from `reader`.
    /// The coordinator sends no response.
    pub async fn send<R>(&self, name: &str, len: u64, reader: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::Send).await?;
        wire::write_string(&mut stream, name).await?;
        wire::write_size(&mut stream, len as i64).await?;
        wire::copy_payload(reader, &mut stream, len).await?;
        stream.shutdown().await?;
        Ok(())
    }

    /// RECEIVE a file into `writer`. Returns the served name and size, or
    /// `None` when the coordinator reports the name unknown.
    pub async fn receive<W>(&self, name: &str, writer: &mut W) -> Result<Option<(String, u64)>>
    where
        W: AsyncWrite + Unpin,
    {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::Receive).await?;
        wire::write_string(&mut stream, name).await?;
        if !wire::read_flag(&mut stream).await? {
            return Ok(None);
        }
        let served_name = wire::read_string(&mut stream).await?;
        let size = wire::read_size(&mut stream).await?;
        if size < 0 {
            bail!("coordinator sent negative file size {size}");
        }
        wire::copy_payload(&mut stream, writer, size as u64).await?;
        Ok(Some((served_name, size as u64)))
    }

    /// DELETE a file's local parts on the coordinator. Returns the
    /// aggregate ack string.
    pub async fn delete(&self, name: &str) -> Result<String> {
        let mut stream = connect(&self.addr).await?;
        wire::write_command(&mut stream, Command::Delete).await?;
        wire::write_string(&mut stream, name).await?;
        Ok(wire::read_string(&mut stream).await?)
    }
}
