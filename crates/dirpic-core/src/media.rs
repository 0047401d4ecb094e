use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;

/// A candidate file found under the source root. Never modified by the organizer.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Path of the source file
    pub path: PathBuf,
    /// Just the filename
    pub filename: String,
    /// Lowercased extension without the dot (empty if none)
    pub extension: String,
    /// Last modification time of the source
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
}

impl MediaFile {
    pub fn new(path: PathBuf, modified: SystemTime, size: u64) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            filename,
            extension,
            modified,
            size,
        }
    }

    /// Build from a filesystem stat of `path`.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        Self::from_metadata(path.to_path_buf(), &meta)
    }

    pub fn from_metadata(path: PathBuf, meta: &std::fs::Metadata) -> anyhow::Result<Self> {
        let modified = meta
            .modified()
            .with_context(|| format!("reading modification time of {}", path.display()))?;
        Ok(Self::new(path, modified, meta.len()))
    }
}
