//! Drop storage subsystem.
//!
//! # Data Flow
//! ```text
//! Capture:
//!     DropStore::create(id) → DropSink (staging, invisible to readers)
//!     → AsyncWrite of the serialized request
//!     → DropSink::publish() (atomic, no-clobber) → object visible
//!
//! Replay:
//!     DropStore::open(id) → DropReader (published objects only)
//! ```
//!
//! # Design Decisions
//! - Objects are immutable once published; there is no rename, list or delete
//! - A sink dropped without `publish` never becomes visible
//! - Existence is checked against the backend on every open, no in-memory index

pub mod fs;
pub mod memory;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::schema::{StorageBackendKind, StorageConfig};
use crate::drop::DropId;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Readable byte stream of a published drop.
pub type DropReader = Pin<Box<dyn AsyncRead + Send>>;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("drop {0} not found")]
    NotFound(DropId),

    #[error("drop {0} already exists")]
    AlreadyExists(DropId),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A writable, not yet visible drop.
#[async_trait]
pub trait DropSink: AsyncWrite + Send + Unpin {
    /// Make everything written so far visible under the drop's ID.
    ///
    /// Returns the number of bytes published.
    async fn publish(self: Box<Self>) -> Result<u64, StoreError>;
}

/// Durable, byte-addressable store keyed by drop ID.
#[async_trait]
pub trait DropStore: Send + Sync + 'static {
    /// Start a new object. Fails with `AlreadyExists` if the key is taken.
    async fn create(&self, id: &DropId) -> Result<Box<dyn DropSink>, StoreError>;

    /// Open a published object. Fails with `NotFound` if there is none.
    async fn open(&self, id: &DropId) -> Result<DropReader, StoreError>;
}

/// Build the store selected by configuration, sweeping stale staging files
/// first when asked to.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn DropStore>, StoreError> {
    match config.backend {
        StorageBackendKind::Memory => {
            tracing::warn!("Using in-memory drop storage; drops are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackendKind::Fs => {
            let store = FsStore::open(&config.root).await?;

            if config.sweep_on_start {
                let removed = store
                    .sweep_staging(Duration::from_secs(config.staging_max_age_secs))
                    .await?;
                tracing::info!(removed, "Swept stale staging objects");
            }

            Ok(Arc::new(store))
        }
    }
}
