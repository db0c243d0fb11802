//! Checkpoint store implementation
//!
//! Provides file-based checkpoint persistence with atomic writes.

use super::types::Checkpoint;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Store for persisting and loading the export checkpoint
#[derive(Debug)]
pub struct CheckpointStore {
    /// Path to the checkpoint file
    path: PathBuf,
    /// Last checkpoint loaded or saved (cached)
    current: Arc<RwLock<Option<Checkpoint>>>,
}

impl CheckpointStore {
    /// Create a store backed by the given file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self::new(PathBuf::new())
    }

    /// Create an in-memory store holding `checkpoint`
    pub fn in_memory_with(checkpoint: Checkpoint) -> Self {
        Self {
            path: PathBuf::new(),
            current: Arc::new(RwLock::new(Some(checkpoint))),
        }
    }

    /// Read the persisted checkpoint.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    pub async fn try_load(&self) -> Result<Option<Checkpoint>> {
        if self.is_in_memory() {
            return Ok(self.current.read().await.clone());
        }

        if !self.path.exists() {
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to read checkpoint file: {e}")))?;

        let checkpoint: Checkpoint = serde_json::from_str(&contents)
            .map_err(|e| Error::checkpoint(format!("Failed to parse checkpoint file: {e}")))?;

        *self.current.write().await = Some(checkpoint.clone());
        Ok(Some(checkpoint))
    }

    /// Load the persisted checkpoint, falling back to `default`.
    ///
    /// A missing file is the normal first-run case; an unreadable or corrupt
    /// file is reported as a warning and treated the same way.
    pub async fn load_or(&self, default: Checkpoint) -> Checkpoint {
        match self.try_load().await {
            Ok(Some(checkpoint)) => {
                debug!(path = %self.path.display(), "Loaded checkpoint");
                checkpoint
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No checkpoint found, starting fresh");
                default
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unusable checkpoint, starting from the default window"
                );
                default
            }
        }
    }

    /// Persist `checkpoint`, replacing any previous content.
    ///
    /// The file is written under a temporary name, flushed, then renamed over
    /// the old one, so a failed write never leaves a truncated checkpoint.
    /// The cached copy only changes once the file is in place.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if self.is_in_memory() {
            *self.current.write().await = Some(checkpoint.clone());
            return Ok(());
        }

        let contents = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| Error::checkpoint(format!("Failed to serialize checkpoint: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        if let Err(e) = write_synced(&temp_path, contents.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::checkpoint(format!(
                "Failed to write checkpoint file: {e}"
            )));
        }

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::checkpoint(format!("Failed to rename checkpoint file: {e}")))?;

        *self.current.write().await = Some(checkpoint.clone());
        Ok(())
    }

    /// Last checkpoint loaded or successfully saved through this store
    pub async fn current(&self) -> Option<Checkpoint> {
        self.current.read().await.clone()
    }

    /// Get the checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

impl Clone for CheckpointStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            current: Arc::clone(&self.current),
        }
    }
}
