//! File-system operations the placement engine depends on.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// What placement needs to know about an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified: SystemTime,
    pub size: u64,
}

pub trait FileSystem {
    /// Stat `path`, following symlinks. `Ok(None)` when nothing exists there.
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;
    /// Whether both paths name the same underlying file (device + inode).
    fn same_file(&self, a: &Path, b: &Path) -> io::Result<bool>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()>;
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64>;
    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The host file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

#[cfg(unix)]
fn file_identity(meta: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_identity(_meta: &fs::Metadata) -> Option<(u64, u64)> {
    None
}

impl FileSystem for RealFs {
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(FileStat {
                modified: meta.modified()?,
                size: meta.len(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn same_file(&self, a: &Path, b: &Path) -> io::Result<bool> {
        let a = file_identity(&fs::metadata(a)?);
        let b = file_identity(&fs::metadata(b)?);
        Ok(a.is_some() && a == b)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()> {
        fs::hard_link(src, dst)
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        fs::copy(src, dst)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(modified))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
