//! The fixed audio asset.
//!
//! Validated once at startup. A missing asset is a configuration fault and
//! the process refuses to start.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The looped audio asset. Read-only; only its path is passed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    path: PathBuf,
}

impl AudioSource {
    /// Validate that `path` names an existing regular file.
    ///
    /// Relative paths are resolved against the working directory so the
    /// gateway receives an absolute path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let resolved = path
            .canonicalize()
            .map_err(|e| ConfigError::MissingAudioAsset(format!("{}: {e}", path.display())))?;

        if !resolved.is_file() {
            return Err(ConfigError::MissingAudioAsset(format!(
                "{} is not a regular file",
                resolved.display()
            )));
        }

        Ok(Self { path: resolved })
    }

    /// Build a source without touching the filesystem.
    ///
    /// For tests and callers whose asset lives on the gateway host.
    #[must_use]
    pub fn unchecked(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the asset.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
