//! JSON-file persistence sink.
//!
//! The history is one JSON array, rewritten wholesale on every append. That
//! is O(n) per flush, fine at one sample every 30 seconds for the lifetime of
//! a single run (the file is truncated at startup). A long-lived deployment
//! would want an append-only line format instead.

use crate::error::{Result, ThermoError};
use crate::history::SamplePoint;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Append-only sample history stored as a JSON array.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    // Serializes the read-before-rewrite of `append` against readers
    file_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the history to an empty array.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.file_lock.lock().await;
        self.write_unlocked(&[]).await
    }

    /// Read the collection, append `sample`, rewrite the file.
    ///
    /// A missing or corrupt file counts as an empty history. Returns the
    /// number of samples now stored.
    pub async fn append(&self, sample: SamplePoint) -> Result<usize> {
        let _guard = self.file_lock.lock().await;
        let mut samples = self.read_unlocked().await;
        samples.push(sample);
        self.write_unlocked(&samples).await?;
        Ok(samples.len())
    }

    /// All stored samples in append order; empty if the file cannot be read.
    pub async fn load(&self) -> Vec<SamplePoint> {
        let _guard = self.file_lock.lock().await;
        self.read_unlocked().await
    }

    async fn read_unlocked(&self) -> Vec<SamplePoint> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "history file absent, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read history");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "history file is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_unlocked(&self, samples: &[SamplePoint]) -> Result<()> {
        let json = serde_json::to_vec_pretty(samples)?;

        // Write beside the target and rename so a crash never leaves half a file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await.map_err(|e| {
            ThermoError::persistence_error(format!("writing {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            ThermoError::persistence_error(format!("replacing {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
