//! Content handle abstraction.
//!
//! A [`ContentHandle`] is the only boundary the loader depends on: something that
//! can refresh its metadata, report a size, and hand out fresh byte streams either
//! sequentially from offset 0 or as seekable random-access content.

use crate::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek};

/// Sequential byte stream positioned at some offset of a resource
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Stream that can be positioned with `seek` before being read
pub trait RandomAccessStream: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> RandomAccessStream for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

/// Capability abstracting a seekable, refreshable, sized byte-bearing resource
///
/// Implementations cache their metadata: [`size`](ContentHandle::size) and
/// [`has_content`](ContentHandle::has_content) reflect the state observed by the
/// last successful [`refresh`](ContentHandle::refresh).
#[async_trait]
pub trait ContentHandle: Send + Sync {
    /// Human-readable identifier of the resource
    fn location(&self) -> &str;

    /// Re-synchronize cached metadata with the underlying resource
    async fn refresh(&mut self) -> Result<()>;

    /// Byte length of the content as of the last refresh (0 without content)
    fn size(&self) -> u64;

    /// Whether the resource had a content body at the last refresh
    fn has_content(&self) -> bool;

    /// Open a fresh stream positioned at offset 0
    async fn open_sequential(&self) -> Result<ByteStream>;

    /// Open a stream that supports seeking to an arbitrary offset
    async fn open_random_access(&self) -> Result<Box<dyn RandomAccessStream>>;

    /// Release underlying resources. Must be idempotent.
    fn close(&mut self) -> Result<()>;
}
