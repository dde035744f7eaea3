//! # rltail - Adaptive Log-Source Loader
//!
//! Opens log sources for viewing and following: detects gzip content, captures a
//! decoded probe sample for format detection, and keeps a byte stream in sync
//! with a resource that grows or gets rotated underneath it.
//!
//! ## Features
//!
//! - **Compression Sniffing**: gzip detected from the first two bytes, decoded transparently
//! - **Probe Sample**: bounded decoded prefix captured once at open time
//! - **Tail Mode**: start at the current end and deliver only appended bytes
//! - **Rotation Handling**: growth continues where reading stopped, truncation restarts at 0
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Loader options and follow-loop configuration
//! - [`source`] - Content handles, tracked streams and the source loader

// Core modules
pub mod config;
pub mod error;
pub mod source;

// Re-export commonly used types for convenience
pub use config::{Config, LoaderOptions};
pub use error::{Result, RltailError};
pub use source::{
    ContentHandle, LocalFileHandle, MemoryHandle, OpenMode, SizeChange, SourceLoader,
    TrackedStream,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
