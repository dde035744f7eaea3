//! Loader and follow-loop configuration.
//!
//! [`Config`] always exists with sensible defaults. Reading it from a TOML file
//! requires the `config` feature (serde + toml + dirs).
//!
//! ```toml
//! poll_interval_ms = 500
//!
//! [loader]
//! tailing = true
//! open_mode = "from_end"
//! probe_size = 10000
//! ```

use crate::error::{Result, RltailError};
use crate::source::compression::DEFAULT_PROBE_SIZE;
use crate::source::OpenMode;
use std::time::Duration;

#[cfg(feature = "config")]
use std::path::{Path, PathBuf};

/// Options consumed by [`SourceLoader::open_with`](crate::source::SourceLoader::open_with)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct LoaderOptions {
    /// Whether the source is followed live
    pub tailing: bool,
    /// Where the initial stream starts
    pub open_mode: OpenMode,
    /// Upper bound on the decoded probe sample
    pub probe_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            tailing: false,
            open_mode: OpenMode::FromStart,
            probe_size: DEFAULT_PROBE_SIZE,
        }
    }
}

impl LoaderOptions {
    pub fn validate(&self) -> Result<()> {
        if self.probe_size == 0 {
            return Err(RltailError::config("probe_size must be greater than zero"));
        }
        Ok(())
    }
}

/// Top-level configuration for the `rltail` binary
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct Config {
    pub loader: LoaderOptions,
    /// Delay between reconciliation passes while following
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loader: LoaderOptions::default(),
            poll_interval_ms: 500,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(RltailError::config(
                "poll_interval_ms must be greater than zero",
            ));
        }
        self.loader.validate()
    }
}

#[cfg(feature = "config")]
impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| RltailError::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RltailError::io_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        Self::from_toml_str(&content)
    }

    /// `<config_dir>/rltail/config.toml`, when a config directory exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rltail").join("config.toml"))
    }

    /// Load the default config file if present, otherwise fall back to defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}
