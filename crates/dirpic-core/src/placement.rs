use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::fs::FileSystem;
use crate::layout::Destination;
use crate::media::MediaFile;

/// What placing one file did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Destination is already a hard link to the source
    AlreadyLinked,
    /// Destination has the source's modification time
    AlreadyUpToDate,
    Linked,
    /// Source and destination are on different devices
    Copied,
    /// Destination holds a different file, which is left alone
    Skipped,
    /// Copy fallback failed; the source stays where it is
    Failed(String),
}

impl PlacementOutcome {
    /// True when nothing had to be written.
    pub fn is_already_placed(&self) -> bool {
        matches!(self, Self::AlreadyLinked | Self::AlreadyUpToDate)
    }
}

/// Hidden sibling a copy is written to before it is renamed into place.
fn temp_path(dest: &Destination) -> PathBuf {
    dest.dir.join(format!(".{}.dirpic-tmp", dest.filename))
}

/// Make `dest` reflect `source`, by hard link when possible and by copy across devices.
///
/// `Err` is a per-file failure (directory creation, unexpected link error, a
/// destination that cannot be inspected). Expected conditions are reported
/// through the returned outcome.
pub fn place<F: FileSystem>(
    fs: &F,
    source: &MediaFile,
    dest: &Destination,
) -> anyhow::Result<PlacementOutcome> {
    let final_dst = dest.path();

    let existing = fs
        .stat(&final_dst)
        .with_context(|| format!("checking destination {}", final_dst.display()))?;

    if let Some(existing) = existing {
        if fs
            .same_file(&source.path, &final_dst)
            .with_context(|| format!("comparing {} with {}", source.path.display(), final_dst.display()))?
        {
            return Ok(PlacementOutcome::AlreadyLinked);
        }
        if existing.modified == source.modified {
            return Ok(PlacementOutcome::AlreadyUpToDate);
        }
        // Linking below fails with AlreadyExists; the other file is kept
        log::debug!(
            "{}: destination {} ({} bytes) is a different file",
            source.path.display(),
            final_dst.display(),
            existing.size
        );
    }

    fs.create_dir_all(&dest.dir)
        .with_context(|| format!("making dest dir {}", dest.dir.display()))?;

    match fs.hard_link(&source.path, &final_dst) {
        Ok(()) => Ok(PlacementOutcome::Linked),
        // Copying across devices would displace the other file too
        Err(e)
            if e.kind() == io::ErrorKind::AlreadyExists
                || (e.kind() == io::ErrorKind::CrossesDevices && existing.is_some()) =>
        {
            log::warn!(
                "{}: destination {} already holds another file, skipping",
                source.path.display(),
                final_dst.display()
            );
            Ok(PlacementOutcome::Skipped)
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            log::warn!(
                "{}: cannot hard link across devices, copying to {}",
                source.path.display(),
                final_dst.display()
            );
            let tmp = temp_path(dest);
            match copy_into_place(fs, source, &tmp, &final_dst) {
                Ok(()) => Ok(PlacementOutcome::Copied),
                Err(err) => {
                    log::error!("{}: copy failed: {:#}", source.path.display(), err);
                    if let Err(cleanup) = fs.remove_file(&tmp) {
                        if cleanup.kind() != io::ErrorKind::NotFound {
                            log::warn!("{}: could not remove partial copy: {}", tmp.display(), cleanup);
                        }
                    }
                    Ok(PlacementOutcome::Failed(format!("{:#}", err)))
                }
            }
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!(
            "link {} -> {}",
            source.path.display(),
            final_dst.display()
        ))),
    }
}

/// Copy through `tmp`, stamp the source mtime so the next run sees it as current, then rename.
fn copy_into_place<F: FileSystem>(
    fs: &F,
    source: &MediaFile,
    tmp: &Path,
    final_dst: &Path,
) -> anyhow::Result<()> {
    if fs
        .stat(tmp)
        .with_context(|| format!("checking {}", tmp.display()))?
        .is_some()
    {
        // Left over from an interrupted run
        fs.remove_file(tmp)
            .with_context(|| format!("removing stale {}", tmp.display()))?;
    }
    fs.copy(&source.path, tmp)
        .with_context(|| format!("copying {} to {}", source.path.display(), tmp.display()))?;
    fs.set_modified(tmp, source.modified)
        .with_context(|| format!("setting modification time of {}", tmp.display()))?;
    fs.rename(tmp, final_dst)
        .with_context(|| format!("renaming {} to {}", tmp.display(), final_dst.display()))?;
    Ok(())
}
