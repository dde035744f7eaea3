//! Log source loading with compression sniffing and live tailing.
//!
//! This module provides the core of rltail: a [`SourceLoader`] that opens a
//! [`ContentHandle`], detects gzip content, captures a probe sample for format
//! detection and keeps a byte stream in sync with a growing or rotating resource.

pub mod compression;
pub mod handle;
pub mod loader;
pub mod local;
pub mod memory;
pub mod tracked;

pub use compression::{CompressionType, ContentStream, DEFAULT_PROBE_SIZE, GZIP_MAGIC};
pub use handle::{ByteStream, ContentHandle, RandomAccessStream};
pub use loader::{OpenMode, SizeChange, SourceLoader};
pub use local::LocalFileHandle;
pub use memory::MemoryHandle;
pub use tracked::{ReadProgress, TrackedStream};
