//! Filesystem-backed drop storage.
//!
//! Layout under the configured root:
//! ```text
//! <root>/<id>           published drops
//! <root>/.staging/<id>  captures in progress (or aborted)
//! ```
//! IDs never contain '.', so the staging directory cannot collide with a drop.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::{DropReader, DropSink, DropStore, StoreError};
use crate::drop::DropId;

const STAGING_DIR: &str = ".staging";

/// Drop store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    staging: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        let staging = root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;

        tracing::info!(root = %root.display(), "Filesystem drop store ready");

        Ok(Self { root, staging })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &DropId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn staging_path(&self, id: &DropId) -> PathBuf {
        self.staging.join(id.as_str())
    }

    /// Remove staging files last modified more than `max_age` ago.
    ///
    /// These are captures whose client went away or whose write failed.
    /// Returns how many were removed.
    pub async fn sweep_staging(&self, max_age: Duration) -> Result<usize, StoreError> {
        let now = SystemTime::now();
        let mut entries = fs::read_dir(&self.staging).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age >= max_age {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl DropStore for FsStore {
    async fn create(&self, id: &DropId) -> Result<Box<dyn DropSink>, StoreError> {
        let final_path = self.object_path(id);
        if fs::try_exists(&final_path).await? {
            return Err(StoreError::AlreadyExists(id.clone()));
        }

        let staging_path = self.staging_path(id);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging_path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(id.clone()),
                _ => StoreError::Io(e),
            })?;

        Ok(Box::new(FsSink {
            id: id.clone(),
            file: BufWriter::new(file),
            staging_path,
            final_path,
            written: 0,
        }))
    }

    async fn open(&self, id: &DropId) -> Result<DropReader, StoreError> {
        match File::open(self.object_path(id)).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Staged write of one drop. Dropping it closes the file and leaves the
/// staging entry for the sweep.
struct FsSink {
    id: DropId,
    file: BufWriter<File>,
    staging_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

impl AsyncWrite for FsSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.file).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.written += n as u64;
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}

#[async_trait]
impl DropSink for FsSink {
    async fn publish(self: Box<Self>) -> Result<u64, StoreError> {
        let FsSink {
            id,
            mut file,
            staging_path,
            final_path,
            written,
        } = *self;

        file.flush().await?;
        file.get_ref().sync_all().await?;
        drop(file);

        // hard_link refuses to replace an existing object
        fs::hard_link(&staging_path, &final_path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(id.clone()),
                _ => StoreError::Io(e),
            })?;

        if let Err(e) = fs::remove_file(&staging_path).await {
            tracing::warn!(
                drop_id = %id,
                path = %staging_path.display(),
                error = %e,
                "Published drop but failed to remove staging file"
            );
        }

        Ok(written)
    }
}
