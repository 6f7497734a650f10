//! In-memory drop storage.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::io::AsyncWrite;

use super::{DropReader, DropSink, DropStore, StoreError};
use crate::drop::DropId;

/// Drop store holding published objects in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<DashMap<DropId, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of published drops.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl DropStore for MemoryStore {
    async fn create(&self, id: &DropId) -> Result<Box<dyn DropSink>, StoreError> {
        if self.objects.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.clone()));
        }

        Ok(Box::new(MemorySink {
            id: id.clone(),
            buf: Vec::new(),
            objects: self.objects.clone(),
        }))
    }

    async fn open(&self, id: &DropId) -> Result<DropReader, StoreError> {
        let bytes = self
            .objects
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        Ok(Box::pin(Cursor::new(bytes)))
    }
}

struct MemorySink {
    id: DropId,
    buf: Vec<u8>,
    objects: Arc<DashMap<DropId, Bytes>>,
}

impl AsyncWrite for MemorySink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.buf).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.buf).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.buf).poll_shutdown(cx)
    }
}

#[async_trait]
impl DropSink for MemorySink {
    async fn publish(self: Box<Self>) -> Result<u64, StoreError> {
        let MemorySink { id, buf, objects } = *self;
        let len = buf.len() as u64;

        // the entry guard borrows `objects`, so it must drop first
        let published = match objects.entry(id) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Bytes::from(buf));
                Ok(len)
            }
        };
        published
    }
}
