use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use walkdir::{DirEntry, WalkDir};

/// Regular files below `root`, in directory order.
///
/// Fails only if `root` itself cannot be read. Unreadable entries further down
/// are logged and skipped; `skip` (typically the destination root when it
/// lives inside the source) is not descended into.
pub fn media_candidates(
    root: &Path,
    skip: Option<&Path>,
) -> anyhow::Result<impl Iterator<Item = DirEntry>> {
    let meta = fs::metadata(root)
        .with_context(|| format!("reading source root {}", root.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("source root {} is not a directory", root.display());
    }
    fs::read_dir(root).with_context(|| format!("listing source root {}", root.display()))?;

    let skip: Option<PathBuf> = skip.and_then(|p| fs::canonicalize(p).ok());

    let entries = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(move |e| !is_skipped(e, skip.as_deref()))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("walking: {}", err);
                None
            }
        })
        .filter(|e| {
            let keep = e.file_type().is_file();
            if !keep && !e.file_type().is_dir() {
                log::debug!("{}: not a regular file, ignoring", e.path().display());
            }
            keep
        });

    Ok(entries)
}

fn is_skipped(entry: &DirEntry, skip: Option<&Path>) -> bool {
    let Some(skip) = skip else {
        return false;
    };
    if !entry.file_type().is_dir() {
        return false;
    }
    let skipped = fs::canonicalize(entry.path()).map_or(false, |p| p == skip);
    if skipped {
        log::debug!("{}: destination tree, not descending", entry.path().display());
    }
    skipped
}
