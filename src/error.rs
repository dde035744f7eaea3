//! Error types and handling infrastructure for rltail.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! library error types; the binary adds `anyhow` context on top.
//!
//! ## Error Kinds
//!
//! - **I/O failures**: transport, read and seek failures from the backing store.
//!   They are surfaced to the caller and never retried internally.
//! - **Reconcile failures**: a replacement stream could not be opened while
//!   following a source. The previous stream has already been closed when this
//!   error is returned.
//! - **Probe failures** are not represented here: a failed compression sniff is
//!   treated as "not compressed" and only logged.

use thiserror::Error;

/// The main error type for rltail operations.
#[derive(Error, Debug)]
pub enum RltailError {
    /// Transport, read or seek failure from the backing store
    #[error("I/O operation failed: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A replacement stream could not be opened during reconciliation
    #[error("Failed to reopen {location} at offset {offset}")]
    ReconcileOpen {
        location: String,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The content handle was already closed
    #[error("Content handle is closed: {location}")]
    HandleClosed { location: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Standard Result type for rltail operations.
pub type Result<T> = std::result::Result<T, RltailError>;

impl RltailError {
    /// Create an Io error from an io::Error with additional context
    pub fn io_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a Config error with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Recover the underlying io::Error, if this error carries one
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io { source, .. } | Self::ReconcileOpen { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Convert into an io::Error, keeping the original one when present
    pub fn into_io_error(self) -> std::io::Error {
        match self {
            Self::Io { source, .. } | Self::ReconcileOpen { source, .. } => source,
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}

// Automatic conversion from io::Error to RltailError
impl From<std::io::Error> for RltailError {
    fn from(err: std::io::Error) -> Self {
        let message = match err.kind() {
            std::io::ErrorKind::NotFound => "File not found",
            std::io::ErrorKind::PermissionDenied => "Permission denied",
            _ => "IO operation failed",
        };
        Self::Io {
            message: message.to_string(),
            source: err,
        }
    }
}
