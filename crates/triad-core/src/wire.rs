//! Triad wire format — framing primitives for all Triad communication.
//!
//! Every request travels over its own TCP connection: one command, one
//! optional response, then close. There is no session state and no
//! pipelining. The frames are length-prefixed and big-endian; changing
//! anything here changes the protocol for every component at once.

use std::io;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Maximum length of a string frame (command tags, file and part names).
pub const MAX_NAME_LEN: usize = 64 * 1024;

/// Chunk size for payload streaming. Non-semantic: any value ≥ 1 is correct.
pub const COPY_BUF_SIZE: usize = 64 * 1024;

/// Sentinel size a storage node sends on RETRIEVE when the named part does
/// not exist. A negative size can never describe a real blob, so the
/// coordinator treats it as a deterministic not-found signal.
pub const NOT_FOUND_SIZE: i64 = -1;

// ── Commands ──────────────────────────────────────────────────────────────────

/// Command tags understood by the coordinator and the storage nodes.
///
/// `List`, `Send`, `Receive`, and `Delete` arrive from clients at the
/// coordinator; `Store`, `Retrieve`, and `Delete` arrive from the
/// coordinator at a storage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Send,
    Receive,
    Delete,
    Store,
    Retrieve,
}

impl Command {
    pub fn as_tag(self) -> &'static str {
        match self {
            Command::List => "LIST",
            Command::Send => "SEND",
            Command::Receive => "RECEIVE",
            Command::Delete => "DELETE",
            Command::Store => "STORE",
            Command::Retrieve => "RETRIEVE",
        }
    }
}

impl FromStr for Command {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIST" => Ok(Command::List),
            "SEND" => Ok(Command::Send),
            "RECEIVE" => Ok(Command::Receive),
            "DELETE" => Ok(Command::Delete),
            "STORE" => Ok(Command::Store),
            "RETRIEVE" => Ok(Command::Retrieve),
            other => Err(WireError::UnknownCommand(other.to_string())),
        }
    }
}

// ── Frame primitives ──────────────────────────────────────────────────────────

/// Write a length-prefixed string: u32 byte length, then UTF-8 bytes.
pub async fn write_string<W>(writer: &mut W, value: &str) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = value.as_bytes();
    if bytes.len() > MAX_NAME_LEN {
        return Err(WireError::FrameTooLarge(bytes.len()));
    }
    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(bytes).await?;
    Ok(())
}

/// Read a length-prefixed string. Rejects frames longer than
/// [`MAX_NAME_LEN`] before allocating.
pub async fn read_string<R>(reader: &mut R) -> Result<String, WireError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_NAME_LEN {
        return Err(WireError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(String::from_utf8(buf)?)
}

pub async fn write_command<W>(writer: &mut W, command: Command) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    write_string(writer, command.as_tag()).await
}

pub async fn read_command<R>(reader: &mut R) -> Result<Command, WireError>
where
    R: AsyncRead + Unpin,
{
    read_string(reader).await?.parse()
}

/// Write a payload size (i64). Negative values are reserved for signaling;
/// see [`NOT_FOUND_SIZE`].
pub async fn write_size<W>(writer: &mut W, size: i64) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i64(size).await?;
    Ok(())
}

pub async fn read_size<R>(reader: &mut R) -> Result<i64, WireError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_i64().await?)
}

/// Write an element count (i32), used by the LIST reply.
pub async fn write_count<W>(writer: &mut W, count: i32) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i32(count).await?;
    Ok(())
}

pub async fn read_count<R>(reader: &mut R) -> Result<i32, WireError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_i32().await?)
}

/// Write a one-byte boolean flag.
pub async fn write_flag<W>(writer: &mut W, value: bool) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(u8::from(value)).await?;
    Ok(())
}

pub async fn read_flag<R>(reader: &mut R) -> Result<bool, WireError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u8().await? != 0)
}

/// Copy exactly `len` payload bytes from `reader` to `writer` in bounded
/// chunks. Never reads past `len`; a peer that closes the connection early
/// produces an `UnexpectedEof` error rather than a hang.
pub async fn copy_payload<R, W>(reader: &mut R, writer: &mut W, len: u64) -> Result<(), WireError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let got = reader.read(&mut buf[..want]).await?;
        if got == 0 {
            return Err(WireError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("payload ended with {remaining} bytes still expected"),
            )));
        }
        writer.write_all(&buf[..got]).await?;
        remaining -= got as u64;
    }
    Ok(())
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise while framing or deframing wire data.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("wire i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("unknown command tag: {0:?}")]
    UnknownCommand(String),

    #[error("frame length {0} exceeds maximum {MAX_NAME_LEN}")]
    FrameTooLarge(usize),

    #[error("string frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
