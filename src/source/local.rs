//! Local file content handle backed by `tokio::fs`.

use crate::error::{Result, RltailError};
use crate::source::handle::{ByteStream, ContentHandle, RandomAccessStream};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// Content handle for a file on local disk
///
/// A missing path is not an error at refresh time: it simply has no content. A
/// directory has no content either. Opening a stream on either fails.
#[derive(Debug)]
pub struct LocalFileHandle {
    path: PathBuf,
    location: String,
    size: u64,
    has_content: bool,
    closed: bool,
}

impl LocalFileHandle {
    /// Create a handle for `path`. Metadata is not read until the first refresh.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let location = path.display().to_string();
        Self {
            path,
            location,
            size: 0,
            has_content: false,
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(RltailError::HandleClosed {
                location: self.location.clone(),
            });
        }
        Ok(())
    }

    async fn open_file(&self) -> Result<File> {
        self.ensure_open()?;
        File::open(&self.path).await.map_err(|e| {
            RltailError::io_error(format!("Failed to open file: {}", self.path.display()), e)
        })
    }
}

#[async_trait]
impl ContentHandle for LocalFileHandle {
    fn location(&self) -> &str {
        &self.location
    }

    async fn refresh(&mut self) -> Result<()> {
        self.ensure_open()?;
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => {
                self.has_content = metadata.is_file();
                self.size = if self.has_content { metadata.len() } else { 0 };
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.has_content = false;
                self.size = 0;
            }
            Err(e) => {
                return Err(RltailError::io_error(
                    format!("Failed to read file metadata: {}", self.path.display()),
                    e,
                ));
            }
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn has_content(&self) -> bool {
        self.has_content
    }

    async fn open_sequential(&self) -> Result<ByteStream> {
        Ok(Box::new(self.open_file().await?))
    }

    async fn open_random_access(&self) -> Result<Box<dyn RandomAccessStream>> {
        Ok(Box::new(self.open_file().await?))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
