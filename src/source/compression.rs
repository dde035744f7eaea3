//! Compression sniffing, probe capture and transparent decompression.
//!
//! Detection looks at the first two bytes of content only: the gzip magic number
//! `1f 8b` (RFC 1952) is the sole compression signal. Decompression is delegated
//! to `async-compression`.

use crate::error::{Result, RltailError};
use crate::source::handle::ByteStream;
use crate::source::tracked::TrackedStream;
use async_compression::tokio::bufread::GzipDecoder;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

/// Gzip magic number (RFC 1952)
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default upper bound on the decoded probe sample
pub const DEFAULT_PROBE_SIZE: usize = 10_000;

/// Compression framing of a source, decided once when the source is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression - plain text content
    None,
    /// Gzip compression
    Gzip,
}

impl CompressionType {
    /// Get human-readable name for the compression type
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }

    /// Check if this type represents a compressed format
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Check whether a header starts with the gzip magic number
///
/// Both bytes are compared individually; fewer than two bytes never match.
pub fn is_gzip_magic(header: &[u8]) -> bool {
    header.len() >= 2 && header[0] == GZIP_MAGIC[0] && header[1] == GZIP_MAGIC[1]
}

/// Read up to two header bytes from `stream` and classify them
///
/// Returns the classification together with the bytes actually consumed, so the
/// caller can replay them. A read error fails open: the source is reported as
/// uncompressed and the error is only logged.
pub async fn sniff_compression(stream: &mut ByteStream) -> (CompressionType, Vec<u8>) {
    let mut header = [0u8; 2];
    let mut filled = 0;

    while filled < header.len() {
        match stream.read(&mut header[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => {
                log::debug!("Compression sniff failed, assuming plain content: {}", e);
                return (CompressionType::None, header[..filled].to_vec());
            }
        }
    }

    let compression = if is_gzip_magic(&header[..filled]) {
        CompressionType::Gzip
    } else {
        CompressionType::None
    };
    (compression, header[..filled].to_vec())
}

/// Capture at most `bound` bytes of decoded leading content
///
/// `header` holds the bytes already consumed from `rest` by the sniff and is
/// replayed in front of it. For gzip content a decoding error after some output
/// keeps what was decoded so far: a file that is still being written has no
/// trailer yet.
pub async fn capture_probe(
    header: Vec<u8>,
    rest: ByteStream,
    compression: CompressionType,
    bound: usize,
) -> Result<Vec<u8>> {
    let replay = Cursor::new(header).chain(rest);

    match compression {
        CompressionType::None => {
            let mut probe = Vec::with_capacity(bound.min(64 * 1024));
            replay
                .take(bound as u64)
                .read_to_end(&mut probe)
                .await
                .map_err(|e| RltailError::io_error("Failed to read probe sample", e))?;
            Ok(probe)
        }
        CompressionType::Gzip => {
            let mut decoder = GzipDecoder::new(BufReader::new(replay));
            decoder.multiple_members(true);
            decode_bounded(decoder, bound).await
        }
    }
}

async fn decode_bounded<R: AsyncRead + Unpin>(mut decoder: R, bound: usize) -> Result<Vec<u8>> {
    let mut probe = vec![0u8; bound];
    let mut filled = 0;

    while filled < bound {
        match decoder.read(&mut probe[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if filled > 0 => {
                log::debug!("Gzip probe stopped after {} bytes: {}", filled, e);
                break;
            }
            Err(e) => {
                return Err(RltailError::io_error("Failed to decompress probe sample", e));
            }
        }
    }

    probe.truncate(filled);
    Ok(probe)
}

/// Decoded stream handed to consumers
///
/// Holds exactly one [`TrackedStream`], either directly or beneath a gzip
/// decoder. The tracked position always counts raw (compressed) bytes.
pub enum ContentStream {
    Plain(TrackedStream),
    Gzip(GzipDecoder<BufReader<TrackedStream>>),
}

impl ContentStream {
    /// Layer decompression over `tracked` when the source is compressed
    pub fn new(tracked: TrackedStream, compression: CompressionType) -> Self {
        match compression {
            CompressionType::None => Self::Plain(tracked),
            CompressionType::Gzip => {
                let mut decoder = GzipDecoder::new(BufReader::new(tracked));
                decoder.multiple_members(true);
                Self::Gzip(decoder)
            }
        }
    }

    pub fn tracked(&self) -> &TrackedStream {
        match self {
            Self::Plain(tracked) => tracked,
            Self::Gzip(decoder) => decoder.get_ref().get_ref(),
        }
    }

    pub fn tracked_mut(&mut self) -> &mut TrackedStream {
        match self {
            Self::Plain(tracked) => tracked,
            Self::Gzip(decoder) => decoder.get_mut().get_mut(),
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Gzip(_))
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_compressed() { "Gzip" } else { "Plain" };
        f.debug_tuple(kind).field(self.tracked()).finish()
    }
}

impl AsyncRead for ContentStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(tracked) => Pin::new(tracked).poll_read(cx, buf),
            Self::Gzip(decoder) => Pin::new(decoder).poll_read(cx, buf),
        }
    }
}
