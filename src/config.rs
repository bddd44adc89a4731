use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Options for one synchronization run.
///
/// Built from command-line arguments; nothing is read from or written to disk.
///
/// ```rust
/// use takeout_exif_sync::config::SyncConfig;
///
/// let config = SyncConfig {
///     root: "Takeout/Google Photos".into(),
///     delete_sidecars: true,
///     ..Default::default()
/// };
/// assert_eq!(config.sidecar_extension, "json");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory scanned recursively for sidecars.
    pub root: PathBuf,
    /// Remove each sidecar once its image has been handled.
    pub delete_sidecars: bool,
    /// Sidecar file extension, without the dot.
    pub sidecar_extension: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            delete_sidecars: false,
            sidecar_extension: "json".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn new(root: impl Into<PathBuf>, delete_sidecars: bool) -> Self {
        Self {
            root: root.into(),
            delete_sidecars,
            ..Default::default()
        }
    }

    /// Check the options before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::NotADirectory {
                path: self.root.clone(),
            });
        }
        Ok(())
    }
}
