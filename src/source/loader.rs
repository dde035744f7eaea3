//! Source loader: compression sniffing, initial positioning and reconciliation.
//!
//! A [`SourceLoader`] owns one [`ContentHandle`] and exactly one live
//! [`ContentStream`]. Construction decides compression from the first two bytes,
//! captures a decoded probe sample and opens the stream consumers read from.
//! [`SourceLoader::reload_if_changed`] is then called repeatedly while following
//! the source; it swaps the stream when the resource grows or shrinks.
//!
//! # Concurrency
//!
//! Every mutating operation takes `&mut self`, so reads and reconciliation on the
//! same loader are serialized by the caller. Nothing here times out: wrap calls in
//! `tokio::time::timeout` if the backing store may hang.
//!
//! # Limitations
//!
//! Compression is never re-evaluated. If a rotation swaps plain content for gzip
//! content (or the reverse) at the same location, the new content is misread.

use crate::config::LoaderOptions;
use crate::error::{Result, RltailError};
use crate::source::compression::{
    capture_probe, sniff_compression, CompressionType, ContentStream,
};
use crate::source::handle::ContentHandle;
use crate::source::tracked::{ReadProgress, TrackedStream};
use std::cmp::Ordering;
use std::io::SeekFrom;
use tokio::io::AsyncSeekExt;

/// Where the initial stream of a source starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum OpenMode {
    /// Deliver the whole content from byte 0
    #[default]
    FromStart,
    /// Deliver only content appended after the source was opened
    FromEnd,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeChange {
    /// Content was appended; the new stream continues at `from`
    Grown { from: u64, to: u64 },
    /// Content was truncated or rotated; the new stream restarts at byte 0.
    /// `to` is the size observed after the new stream was opened.
    Shrunk { from: u64, to: u64 },
    /// Nothing to do
    Unchanged,
}

impl SizeChange {
    /// Compare the last known size against the current one
    pub fn classify(last_known: u64, current: u64) -> Self {
        match current.cmp(&last_known) {
            Ordering::Greater => Self::Grown {
                from: last_known,
                to: current,
            },
            Ordering::Less => Self::Shrunk {
                from: last_known,
                to: current,
            },
            Ordering::Equal => Self::Unchanged,
        }
    }
}

/// Adaptive loader for one log source
pub struct SourceLoader {
    location: String,
    handle: Box<dyn ContentHandle>,
    tailing: bool,
    compression: CompressionType,
    probe: Box<[u8]>,
    stream: ContentStream,
    last_known_size: u64,
    closed: bool,
}

impl SourceLoader {
    /// Open a non-tailing source from the start with default options
    pub async fn open<H: ContentHandle + 'static>(handle: H) -> Result<Self> {
        Self::open_with(handle, &LoaderOptions::default()).await
    }

    /// Open a tailing source with the given open mode
    pub async fn open_tailing<H: ContentHandle + 'static>(
        handle: H,
        open_mode: OpenMode,
    ) -> Result<Self> {
        let options = LoaderOptions {
            tailing: true,
            open_mode,
            ..LoaderOptions::default()
        };
        Self::open_with(handle, &options).await
    }

    /// Open a source with explicit options
    ///
    /// Construction is atomic: on failure every stream opened so far is dropped
    /// and the handle is closed.
    pub async fn open_with<H: ContentHandle + 'static>(
        handle: H,
        options: &LoaderOptions,
    ) -> Result<Self> {
        options.validate()?;
        let mut handle: Box<dyn ContentHandle> = Box::new(handle);
        let location = handle.location().to_string();

        match Self::initialize(handle.as_mut(), options).await {
            Ok((compression, probe, stream)) => {
                let last_known_size = if handle.has_content() {
                    handle.size()
                } else {
                    0
                };
                log::info!(
                    "Opened {} (compression: {}, mode: {:?}, size: {} bytes, probe: {} bytes)",
                    location,
                    compression.name(),
                    options.open_mode,
                    last_known_size,
                    probe.len()
                );

                Ok(Self {
                    location,
                    handle,
                    tailing: options.tailing,
                    compression,
                    probe: probe.into_boxed_slice(),
                    stream,
                    last_known_size,
                    closed: false,
                })
            }
            Err(e) => {
                if let Err(close_err) = handle.close() {
                    log::warn!("Failed to close {}: {}", location, close_err);
                }
                Err(e)
            }
        }
    }

    async fn initialize(
        handle: &mut dyn ContentHandle,
        options: &LoaderOptions,
    ) -> Result<(CompressionType, Vec<u8>, ContentStream)> {
        handle.refresh().await?;

        // The peeking stream is consumed by the probe and dropped here.
        let mut peek = handle.open_sequential().await?;
        let (compression, header) = sniff_compression(&mut peek).await;
        let probe = capture_probe(header, peek, compression, options.probe_size).await?;

        let tracked =
            if options.open_mode == OpenMode::FromStart || compression.is_compressed() {
                handle.refresh().await?;
                TrackedStream::new(handle.open_sequential().await?)
            } else {
                let mut random = handle.open_random_access().await?;
                random.seek(SeekFrom::End(0)).await.map_err(|e| {
                    RltailError::io_error(
                        format!("Failed to seek to end of {}", handle.location()),
                        e,
                    )
                })?;
                TrackedStream::new(Box::new(random))
            };

        Ok((compression, probe, ContentStream::new(tracked, compression)))
    }

    /// Compare the current size with the last known one and swap streams if needed
    ///
    /// Growth continues at the old end, seeded so [`bytes_read`](Self::bytes_read)
    /// stays absolute. A shrink restarts from byte 0 and re-reads the size after
    /// reopening. The old stream is closed before the replacement is opened; if
    /// the reopen fails, [`RltailError::ReconcileOpen`] is returned and the last
    /// known size is left untouched.
    pub async fn reload_if_changed(&mut self) -> Result<SizeChange> {
        self.ensure_open()?;
        self.handle.refresh().await?;
        let current = self.handle.size();

        match SizeChange::classify(self.last_known_size, current) {
            SizeChange::Grown { from, to } => {
                self.stream.tracked_mut().close();
                let tracked = self.reopen_at(from).await?;
                self.stream = ContentStream::new(tracked, self.compression);
                self.last_known_size = to;

                log::debug!("{} grew from {} to {} bytes", self.location, from, to);
                Ok(SizeChange::Grown { from, to })
            }
            SizeChange::Shrunk { from, .. } => {
                self.stream.tracked_mut().close();
                let tracked = self.reopen_from_start().await?;
                self.stream = ContentStream::new(tracked, self.compression);

                // The resource may have grown again since the first size read.
                self.handle.refresh().await?;
                self.last_known_size = self.handle.size();

                log::info!(
                    "{} shrank from {} to {} bytes, restarting from the beginning",
                    self.location,
                    from,
                    self.last_known_size
                );
                Ok(SizeChange::Shrunk {
                    from,
                    to: self.last_known_size,
                })
            }
            SizeChange::Unchanged => Ok(SizeChange::Unchanged),
        }
    }

    async fn reopen_at(&self, offset: u64) -> Result<TrackedStream> {
        let mut random = self
            .handle
            .open_random_access()
            .await
            .map_err(|e| self.reconcile_error(offset, e.into_io_error()))?;
        random
            .seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| self.reconcile_error(offset, e))?;
        Ok(TrackedStream::with_offset(Box::new(random), offset))
    }

    async fn reopen_from_start(&self) -> Result<TrackedStream> {
        let stream = self
            .handle
            .open_sequential()
            .await
            .map_err(|e| self.reconcile_error(0, e.into_io_error()))?;
        Ok(TrackedStream::with_offset(stream, 0))
    }

    fn reconcile_error(&self, offset: u64, source: std::io::Error) -> RltailError {
        log::warn!(
            "Failed to reopen {} at offset {}: {}",
            self.location,
            offset,
            source
        );
        RltailError::ReconcileOpen {
            location: self.location.clone(),
            offset,
            source,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(RltailError::HandleClosed {
                location: self.location.clone(),
            });
        }
        Ok(())
    }

    /// Declare the handle's currently cached size as consumed
    pub fn reset_last_known_size(&mut self) {
        self.last_known_size = self.handle.size();
    }

    /// Close the live stream and release the handle
    ///
    /// Safe to call repeatedly. Close failures are logged, never returned.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stream.tracked_mut().close();
        if let Err(e) = self.handle.close() {
            log::warn!("Failed to close {}: {}", self.location, e);
        }
    }

    /// Stream consumers read decoded content from
    pub fn content_stream(&mut self) -> &mut ContentStream {
        &mut self.stream
    }

    /// Absolute position of the live tracked stream in raw bytes
    pub fn bytes_read(&self) -> u64 {
        self.stream.tracked().position()
    }

    /// Progress observer for the live stream; replaced on every stream swap
    pub fn progress(&self) -> ReadProgress {
        self.stream.tracked().progress()
    }

    pub fn probe_sample(&self) -> &[u8] {
        &self.probe
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_tailing(&self) -> bool {
        self.tailing
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_compressed()
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    pub fn last_known_size(&self) -> u64 {
        self.last_known_size
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn handle(&self) -> &dyn ContentHandle {
        self.handle.as_ref()
    }
}

impl std::fmt::Debug for SourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceLoader")
            .field("location", &self.location)
            .field("tailing", &self.tailing)
            .field("compression", &self.compression)
            .field("probe_len", &self.probe.len())
            .field("stream", &self.stream)
            .field("last_known_size", &self.last_known_size)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for SourceLoader {
    fn drop(&mut self) {
        self.close();
    }
}
