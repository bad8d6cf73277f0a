//! Inode number table
//!
//! The kernel addresses entries by inode number while the view works on
//! virtual paths. This table hands out a number per looked-up virtual path
//! and drops it once the kernel forgets every lookup of it. It remembers
//! names only; attributes are always fetched fresh.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Inode number of the mount root
pub const ROOT_INO: u64 = 1;

struct InodeEntry {
    path: PathBuf,
    /// Lookups the kernel has not forgotten yet
    lookups: u64,
}

/// Maps inode numbers to virtual paths and back
pub struct InodeTable {
    /// Next inode number to hand out
    next_ino: AtomicU64,
    /// ino -> virtual path
    entries: RwLock<HashMap<u64, InodeEntry>>,
    /// virtual path -> ino
    inos: RwLock<HashMap<PathBuf, u64>>,
}

impl InodeTable {
    pub fn new() -> Self {
        let table = Self {
            next_ino: AtomicU64::new(ROOT_INO + 1),
            entries: RwLock::new(HashMap::new()),
            inos: RwLock::new(HashMap::new()),
        };

        let root = PathBuf::from("/");
        table.entries.write().insert(
            ROOT_INO,
            InodeEntry {
                path: root.clone(),
                lookups: 1,
            },
        );
        table.inos.write().insert(root, ROOT_INO);

        table
    }

    /// Virtual path of an inode
    pub fn path(&self, ino: u64) -> Option<PathBuf> {
        self.entries.read().get(&ino).map(|e| e.path.clone())
    }

    /// Inode already assigned to a virtual path, if any
    pub fn get(&self, path: &Path) -> Option<u64> {
        self.inos.read().get(path).copied()
    }

    /// Record one kernel lookup of `path`, allocating its inode on first sight
    pub fn lookup(&self, path: &Path) -> u64 {
        // Lock order: inos, then entries
        let mut inos = self.inos.write();
        let mut entries = self.entries.write();

        if let Some(&ino) = inos.get(path) {
            if let Some(entry) = entries.get_mut(&ino) {
                entry.lookups += 1;
            }
            return ino;
        }

        let ino = self.next_ino.fetch_add(1, Ordering::SeqCst);
        inos.insert(path.to_path_buf(), ino);
        entries.insert(
            ino,
            InodeEntry {
                path: path.to_path_buf(),
                lookups: 1,
            },
        );
        ino
    }

    /// Drop `nlookup` lookups; the inode goes away when none remain.
    /// The root is never dropped.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INO {
            return;
        }

        let mut inos = self.inos.write();
        let mut entries = self.entries.write();

        let gone = match entries.get_mut(&ino) {
            Some(entry) => {
                entry.lookups = entry.lookups.saturating_sub(nlookup);
                entry.lookups == 0
            }
            None => false,
        };

        if gone {
            if let Some(entry) = entries.remove(&ino) {
                inos.remove(&entry.path);
            }
        }
    }

    /// Virtual path of `name` inside the directory `parent`
    pub fn child_path(&self, parent: u64, name: &std::ffi::OsStr) -> Option<PathBuf> {
        Some(self.path(parent)?.join(name))
    }

    /// Inode of the directory containing `ino`, falling back to the root
    pub fn parent_of(&self, ino: u64) -> u64 {
        self.path(ino)
            .as_deref()
            .and_then(Path::parent)
            .and_then(|parent| self.get(parent))
            .unwrap_or(ROOT_INO)
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
