//! Blob storage — one directory of opaque named byte blobs.
//!
//! Storage nodes keep their part blobs here; the coordinator uses a
//! second instance for its scratch files (inbound buffering, reassembly,
//! and the local copies its DELETE command operates on). Blobs carry no
//! metadata beyond their name and size. Concurrent store and retrieve of
//! the same name is not guarded; the filesystem is the only arbiter.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use triad_core::wire;

/// Outcome of a prefix purge, reported to the caller as one ack string
/// with the per-blob detail only in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    NoneFound,
    AllRemoved,
    PartialFailure,
}

impl PurgeOutcome {
    pub fn ack(self) -> &'static str {
        match self {
            PurgeOutcome::NoneFound => "no matching parts found",
            PurgeOutcome::AllRemoved => "all matching parts removed",
            PurgeOutcome::PartialFailure => "some matching parts could not be removed",
        }
    }
}

pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open a blob store rooted at `root`, creating the directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create blob root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob name to its path. Names are plain file names; any
    /// path separator or parent reference is rejected so a blob can never
    /// escape the root.
    fn path_of(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            bail!("invalid blob name: {name:?}");
        }
        Ok(self.root.join(name))
    }

    /// Stream exactly `len` bytes from `reader` into the blob named
    /// `name`, overwriting any existing blob of that name.
    pub async fn write_from<R>(&self, name: &str, len: u64, reader: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.path_of(name)?;
        let mut file = File::create(&path)
            .await
            .with_context(|| format!("failed to create blob {}", path.display()))?;
        wire::copy_payload(reader, &mut file, len)
            .await
            .with_context(|| format!("failed to write blob {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }

    /// Append exactly `len` bytes from `reader` to the blob, creating it
    /// if absent. Used by the coordinator to build a reassembled file
    /// part by part.
    pub async fn append_from<R>(&self, name: &str, len: u64, reader: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.path_of(name)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open blob {} for append", path.display()))?;
        wire::copy_payload(reader, &mut file, len)
            .await
            .with_context(|| format!("failed to append to blob {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }

    /// Size of the named blob, or `None` if it does not exist.
    pub async fn size_of(&self, name: &str) -> Result<Option<u64>> {
        let path = self.path_of(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to stat blob {}", path.display())),
        }
    }

    /// Open a reader over `len` bytes of the blob starting at `offset`.
    pub async fn open_range(
        &self,
        name: &str,
        offset: u64,
        len: u64,
    ) -> Result<tokio::io::Take<File>> {
        let path = self.path_of(name)?;
        let mut file = File::open(&path)
            .await
            .with_context(|| format!("failed to open blob {}", path.display()))?;
        file.seek(io::SeekFrom::Start(offset)).await?;
        Ok(file.take(len))
    }

    /// Stream the whole blob into `writer`. Returns the byte count.
    pub async fn read_to<W>(&self, name: &str, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let len = self
            .size_of(name)
            .await?
            .with_context(|| format!("blob {name:?} does not exist"))?;
        let mut reader = self.open_range(name, 0, len).await?;
        wire::copy_payload(&mut reader, writer, len).await?;
        Ok(len)
    }

    /// Remove the blob with exactly this name. Returns false when absent.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove blob {}", path.display())),
        }
    }

    /// Remove every blob whose name starts with `base`. Per-blob failures
    /// are logged; the caller only sees the aggregate outcome.
    pub async fn remove_prefix(&self, base: &str) -> Result<PurgeOutcome> {
        // Validate the base the same way as a full name.
        self.path_of(base)?;

        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("failed to list blob root {}", self.root.display()))?;
        let mut found = false;
        let mut failed = false;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !name.starts_with(base) {
                continue;
            }
            found = true;
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                tracing::warn!(blob = name, error = %e, "failed to remove blob during purge");
                failed = true;
            } else {
                tracing::debug!(blob = name, "blob removed by purge");
            }
        }
        Ok(match (found, failed) {
            (false, _) => PurgeOutcome::NoneFound,
            (true, false) => PurgeOutcome::AllRemoved,
            (true, true) => PurgeOutcome::PartialFailure,
        })
    }
}
