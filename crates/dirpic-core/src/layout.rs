use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Where a file lands: the dated album directory and the name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub dir: PathBuf,
    pub filename: String,
}

impl Destination {
    pub fn new(base: &Path, date: NaiveDateTime, filename: &str) -> Self {
        Self {
            dir: build_path(base, date),
            filename: filename.to_string(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

/// `base/YYYY/MM/YYYY-MM-DD_`. The trailing underscore is part of the album
/// directory name so it can be extended by hand (e.g. `2024-03-09_party`).
pub fn build_path(base: &Path, date: NaiveDateTime) -> PathBuf {
    let sub_dir = date.format("%Y/%m/%Y-%m-%d_").to_string();
    // Make it compatible with non UNIX OSes
    let mut dir = base.to_path_buf();
    dir.extend(sub_dir.split('/'));
    dir
}
