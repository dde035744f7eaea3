//! Byte-counting stream wrapper.
//!
//! [`TrackedStream`] behaves exactly like the stream it wraps while keeping a
//! running count of the bytes delivered to the reader. The count can be seeded
//! with a starting offset so it reports an absolute position in the resource.

use crate::source::handle::ByteStream;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Cloneable observer of a [`TrackedStream`] position
///
/// Useful for progress reporting from a task other than the reader.
#[derive(Debug, Clone)]
pub struct ReadProgress(Arc<AtomicU64>);

impl ReadProgress {
    /// Absolute position of the observed stream
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Stream wrapper exposing a non-decreasing count of delivered bytes
pub struct TrackedStream {
    inner: Option<ByteStream>,
    position: Arc<AtomicU64>,
}

impl TrackedStream {
    /// Wrap a stream, counting from zero
    pub fn new(inner: ByteStream) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Wrap a stream whose first byte lives at `offset` in the resource
    pub fn with_offset(inner: ByteStream, offset: u64) -> Self {
        Self {
            inner: Some(inner),
            position: Arc::new(AtomicU64::new(offset)),
        }
    }

    /// Seed offset plus every byte delivered so far
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Observer handle sharing this stream's counter
    pub fn progress(&self) -> ReadProgress {
        ReadProgress(Arc::clone(&self.position))
    }

    /// Drop the wrapped stream. Safe to call more than once.
    pub fn close(&mut self) {
        self.inner.take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl std::fmt::Debug for TrackedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedStream")
            .field("position", &self.position())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Other,
                "read from closed stream",
            )));
        };

        let before = buf.filled().len();
        let result = Pin::new(inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &result {
            let delivered = (buf.filled().len() - before) as u64;
            this.position.fetch_add(delivered, Ordering::Relaxed);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    /// Stream yielding some bytes and then failing
    struct FailingAfter {
        data: Cursor<Vec<u8>>,
    }

    impl AsyncRead for FailingAfter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let before = buf.filled().len();
            match Pin::new(&mut self.data).poll_read(cx, buf) {
                Poll::Ready(Ok(())) if buf.filled().len() == before => Poll::Ready(Err(
                    io::Error::new(io::ErrorKind::ConnectionReset, "transport dropped"),
                )),
                other => other,
            }
        }
    }

    #[tokio::test]
    async fn test_counts_delivered_bytes() {
        let mut stream = TrackedStream::new(Box::new(Cursor::new(b"hello world".to_vec())));
        let mut buf = [0u8; 5];

        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(stream.position(), 5);

        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b" world");
        assert_eq!(stream.position(), 11);
    }

    #[tokio::test]
    async fn test_seed_offset_is_added_to_count() {
        let data = vec![b'x'; 64];
        let mut stream = TrackedStream::with_offset(Box::new(Cursor::new(data)), 1000);
        assert_eq!(stream.position(), 1000);

        let mut total = 0u64;
        let mut buf = [0u8; 7];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            total += n as u64;
            assert_eq!(stream.position(), 1000 + total);
        }
        assert_eq!(total, 64);
    }

    #[tokio::test]
    async fn test_progress_observer_follows_reads() {
        let mut stream = TrackedStream::with_offset(Box::new(Cursor::new(vec![1u8; 10])), 5);
        let progress = stream.progress();

        let mut sink = Vec::new();
        stream.read_to_end(&mut sink).await.unwrap();
        assert_eq!(progress.get(), 15);
    }

    #[tokio::test]
    async fn test_error_propagates_after_accounting() {
        let inner = FailingAfter {
            data: Cursor::new(b"abc".to_vec()),
        };
        let mut stream = TrackedStream::new(Box::new(inner));

        let mut buf = [0u8; 8];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abc");

        let err = stream.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(stream.position(), 3);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_reads() {
        let mut stream = TrackedStream::new(Box::new(Cursor::new(b"data".to_vec())));
        stream.close();
        stream.close();
        assert!(stream.is_closed());

        let mut buf = [0u8; 4];
        assert!(stream.read(&mut buf).await.is_err());
        assert_eq!(stream.position(), 0);
    }
}
