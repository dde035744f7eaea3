//! In-memory content handle.
//!
//! [`MemoryHandle`] keeps its content in a shared, growable buffer. Clones share
//! the same buffer, so one clone can be handed to a loader while another keeps
//! appending to it or replacing it wholesale to simulate log rotation. Streams are
//! live views: bytes appended after a stream was opened are visible to it.

use crate::error::{Result, RltailError};
use crate::source::handle::{ByteStream, ContentHandle, RandomAccessStream};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

#[derive(Debug)]
struct Shared {
    data: RwLock<Vec<u8>>,
    has_content: AtomicBool,
}

/// Content handle over a shared in-memory buffer
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    location: String,
    shared: Arc<Shared>,
    cached_size: u64,
    cached_has_content: bool,
    closed: bool,
}

impl MemoryHandle {
    pub fn new(location: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let cached_size = data.len() as u64;
        Self {
            location: location.into(),
            shared: Arc::new(Shared {
                data: RwLock::new(data),
                has_content: AtomicBool::new(true),
            }),
            cached_size,
            cached_has_content: true,
            closed: false,
        }
    }

    /// Append bytes at the end of the shared buffer
    pub fn append(&self, bytes: &[u8]) {
        self.shared.data.write().extend_from_slice(bytes);
    }

    /// Replace the whole buffer, as a rotation would
    pub fn replace(&self, bytes: impl Into<Vec<u8>>) {
        *self.shared.data.write() = bytes.into();
    }

    /// Mark the resource as having (or lacking) a content body
    pub fn set_has_content(&self, has_content: bool) {
        self.shared.has_content.store(has_content, Ordering::SeqCst);
    }

    /// Current length of the shared buffer, ignoring the metadata cache
    pub fn live_len(&self) -> u64 {
        self.shared.data.read().len() as u64
    }

    fn cursor(&self) -> Result<MemoryCursor> {
        if self.closed {
            return Err(RltailError::HandleClosed {
                location: self.location.clone(),
            });
        }
        Ok(MemoryCursor {
            shared: Arc::clone(&self.shared),
            position: 0,
        })
    }
}

#[async_trait]
impl ContentHandle for MemoryHandle {
    fn location(&self) -> &str {
        &self.location
    }

    async fn refresh(&mut self) -> Result<()> {
        if self.closed {
            return Err(RltailError::HandleClosed {
                location: self.location.clone(),
            });
        }
        self.cached_has_content = self.shared.has_content.load(Ordering::SeqCst);
        self.cached_size = if self.cached_has_content {
            self.live_len()
        } else {
            0
        };
        Ok(())
    }

    fn size(&self) -> u64 {
        self.cached_size
    }

    fn has_content(&self) -> bool {
        self.cached_has_content
    }

    async fn open_sequential(&self) -> Result<ByteStream> {
        Ok(Box::new(self.cursor()?))
    }

    async fn open_random_access(&self) -> Result<Box<dyn RandomAccessStream>> {
        Ok(Box::new(self.cursor()?))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Live read cursor over a [`MemoryHandle`] buffer
#[derive(Debug)]
struct MemoryCursor {
    shared: Arc<Shared>,
    position: u64,
}

impl AsyncRead for MemoryCursor {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.shared.data.read();
        let start = (self.position as usize).min(data.len());
        let len = buf.remaining().min(data.len() - start);
        buf.put_slice(&data[start..start + len]);
        drop(data);

        self.position += len as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for MemoryCursor {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let invalid =
            |message: &str| io::Error::new(io::ErrorKind::InvalidInput, message.to_string());
        let len = i64::try_from(self.shared.data.read().len())
            .map_err(|_| invalid("content length out of range"))?;
        let current =
            i64::try_from(self.position).map_err(|_| invalid("position out of range"))?;

        let target = match position {
            SeekFrom::Start(offset) => i64::try_from(offset).ok(),
            SeekFrom::End(delta) => len.checked_add(delta),
            SeekFrom::Current(delta) => current.checked_add(delta),
        }
        .ok_or_else(|| invalid("seek offset overflows"))?;

        if target < 0 {
            return Err(invalid("seek before start of content"));
        }
        self.position = target as u64;
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position))
    }
}
