//! Source tree access
//!
//! Read-only access to the real directory being overlaid. Every path
//! taken here is relative to the root captured at startup.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::attr::EntryKind;

/// Directory entry from the source tree
#[derive(Debug, Clone)]
pub struct SourceDirEntry {
    pub name: OsString,
    pub kind: EntryKind,
    pub ino: u64,
}

/// Read-only view of the real source directory
#[derive(Debug, Clone)]
pub struct SourceTree {
    /// Absolute, symlink-free root
    root: PathBuf,
}

impl SourceTree {
    pub fn new(root: PathBuf) -> Result<Self> {
        let meta = fs::metadata(&root)
            .map_err(|_| Error::PathNotFound(root.to_string_lossy().to_string()))?;
        if !meta.is_dir() {
            return Err(Error::NotADirectory(root.to_string_lossy().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute real path for a source-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }

    /// Metadata of the entry itself, without following a final symlink
    pub fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        Ok(fs::symlink_metadata(self.resolve(path))?)
    }

    /// Metadata of the entry, following symlinks
    pub fn metadata(&self, path: &Path) -> Result<Metadata> {
        Ok(fs::metadata(self.resolve(path))?)
    }

    /// Read directory entries
    pub fn readdir(&self, path: &Path) -> Result<Vec<SourceDirEntry>> {
        use std::os::unix::fs::DirEntryExt;

        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            entries.push(SourceDirEntry {
                name: entry.file_name(),
                kind: EntryKind::from(entry.file_type()?),
                ino: entry.ino(),
            });
        }

        Ok(entries)
    }

    /// Read symlink target
    pub fn readlink(&self, path: &Path) -> Result<PathBuf> {
        Ok(fs::read_link(self.resolve(path))?)
    }

    /// Read up to `size` bytes at `offset`
    pub fn read(&self, path: &Path, offset: u64, size: u32) -> Result<Vec<u8>> {
        let mut file = fs::File::open(self.resolve(path))?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = Vec::with_capacity(size as usize);
        file.take(size as u64).read_to_end(&mut buffer)?;

        Ok(buffer)
    }

    /// Filesystem statistics of the volume holding the root
    pub fn statvfs(&self) -> Result<nix::sys::statvfs::Statvfs> {
        nix::sys::statvfs::statvfs(self.root.as_path())
            .map_err(|e| Error::Io(std::io::Error::from_raw_os_error(e as i32)))
    }
}
