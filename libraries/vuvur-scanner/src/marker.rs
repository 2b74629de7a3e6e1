//! Durable "initial scan completed" flag

use crate::Result;
use std::path::{Path, PathBuf};

/// Sentinel file whose existence means the initial scan has completed
#[derive(Debug, Clone)]
pub struct InitialScanMarker {
    path: PathBuf,
}

impl InitialScanMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the marker (contents are the completion time, for humans)
    pub fn mark(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, chrono::Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Remove the marker so the next start runs an initial scan again
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
