//! Output destination for rendered media player blocks.
//!
//! The file is emptied once at the start of a run and only appended to
//! afterwards. Each append hands the complete block to a single write so
//! concurrent publishers can interleave whole blocks but never split one.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Errors that can occur while writing the media player config.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output file could not be created or emptied.
    #[error("Failed to truncate {path}: {source}")]
    Truncate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A block could not be appended.
    #[error("Failed to append to {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenient Result alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Append-only destination for media player config text.
#[async_trait]
pub trait ConfigSink: Send + Sync {
    /// Creates the destination, or empties it if it already exists.
    async fn truncate(&self) -> SinkResult<()>;

    /// Appends one complete block.
    async fn append(&self, block: &str) -> SinkResult<()>;

    /// Human-readable location, for logging.
    fn describe(&self) -> String {
        String::from("config sink")
    }
}

/// Writes blocks to a file on disk.
#[derive(Debug, Clone)]
pub struct FileConfigSink {
    path: PathBuf,
}

impl FileConfigSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSink for FileConfigSink {
    async fn truncate(&self) -> SinkResult<()> {
        tokio::fs::write(&self.path, b"")
            .await
            .map_err(|source| SinkError::Truncate {
                path: self.path.clone(),
                source,
            })?;
        log::debug!("[Sink] Truncated {}", self.path.display());
        Ok(())
    }

    async fn append(&self, block: &str) -> SinkResult<()> {
        let to_err = |source| SinkError::Append {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(to_err)?;
        file.write_all(block.as_bytes()).await.map_err(to_err)?;
        file.flush().await.map_err(to_err)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
