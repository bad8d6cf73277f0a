//! Open file handle management

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// An open passthrough file
#[derive(Debug, Clone)]
pub struct FileHandle {
    /// Handle ID given to the kernel
    pub fh: u64,
    /// Inode the handle was opened on
    pub ino: u64,
    /// Virtual path at open time
    pub path: PathBuf,
    /// Open flags
    pub flags: i32,
}

impl FileHandle {
    pub fn new(fh: u64, ino: u64, path: PathBuf, flags: i32) -> Self {
        Self { fh, ino, path, flags }
    }
}

/// Whether open flags ask for write access
pub fn wants_write(flags: i32) -> bool {
    let accmode = flags & libc::O_ACCMODE;
    accmode == libc::O_WRONLY || accmode == libc::O_RDWR
}

/// Manages open file handles
pub struct HandleTable {
    next_fh: AtomicU64,
    handles: RwLock<HashMap<u64, FileHandle>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            next_fh: AtomicU64::new(1),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Open a handle and return its ID
    pub fn open(&self, ino: u64, path: PathBuf, flags: i32) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
        self.handles
            .write()
            .insert(fh, FileHandle::new(fh, ino, path, flags));
        fh
    }

    pub fn get(&self, fh: u64) -> Option<FileHandle> {
        self.handles.read().get(&fh).cloned()
    }

    /// Close handle and return it
    pub fn close(&self, fh: u64) -> Option<FileHandle> {
        self.handles.write().remove(&fh)
    }

}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
