//! Attribute records served by the view
//!
//! Either a sanitized copy of a real entry's attributes, or the
//! synthesized attributes of an archive's directory alias.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Every write permission bit (owner, group, other)
pub const WRITE_BITS: u16 = 0o222;

/// Permission bits of a directory alias: r-x for everyone
pub const ALIAS_DIR_PERM: u16 = 0o555;

/// Kind of entry, mirroring the kernel's file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    RegularFile,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(ft: std::fs::FileType) -> Self {
        use std::os::unix::fs::FileTypeExt;

        if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_block_device() {
            EntryKind::BlockDevice
        } else if ft.is_char_device() {
            EntryKind::CharDevice
        } else if ft.is_fifo() {
            EntryKind::Fifo
        } else if ft.is_socket() {
            EntryKind::Socket
        } else {
            EntryKind::RegularFile
        }
    }
}

impl EntryKind {
    pub fn to_fuser_type(&self) -> fuser::FileType {
        match self {
            EntryKind::RegularFile => fuser::FileType::RegularFile,
            EntryKind::Directory => fuser::FileType::Directory,
            EntryKind::Symlink => fuser::FileType::Symlink,
            EntryKind::BlockDevice => fuser::FileType::BlockDevice,
            EntryKind::CharDevice => fuser::FileType::CharDevice,
            EntryKind::Fifo => fuser::FileType::NamedPipe,
            EntryKind::Socket => fuser::FileType::Socket,
        }
    }
}

/// Attributes of one entry in the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAttributes {
    pub kind: EntryKind,
    pub size: u64,
    pub blocks: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub crtime: SystemTime,
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub blksize: u32,
}

fn unix_time(secs: i64, nsecs: i64) -> SystemTime {
    let nsecs = nsecs.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nsecs)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nsecs as u64)
    }
}

impl EntryAttributes {
    /// Copy attributes from real metadata, unchanged
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            kind: EntryKind::from(meta.file_type()),
            size: meta.len(),
            blocks: meta.blocks(),
            atime: unix_time(meta.atime(), meta.atime_nsec()),
            mtime: unix_time(meta.mtime(), meta.mtime_nsec()),
            ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
            crtime: meta.created().unwrap_or(UNIX_EPOCH),
            perm: (meta.mode() & 0o7777) as u16,
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev() as u32,
            blksize: meta.blksize() as u32,
        }
    }

    /// Passthrough form: same attributes with every write bit cleared
    pub fn read_only(&self) -> Self {
        Self {
            perm: self.perm & !WRITE_BITS,
            ..self.clone()
        }
    }

    /// Directory alias for an archive, borrowing ownership and
    /// modification time from the archive file
    pub fn alias_directory(archive: &EntryAttributes) -> Self {
        Self {
            kind: EntryKind::Directory,
            size: 0,
            blocks: 0,
            atime: UNIX_EPOCH,
            mtime: archive.mtime,
            ctime: archive.mtime,
            crtime: UNIX_EPOCH,
            perm: ALIAS_DIR_PERM,
            nlink: 2,
            uid: archive.uid,
            gid: archive.gid,
            rdev: 0,
            blksize: archive.blksize,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_writable(&self) -> bool {
        self.perm & WRITE_BITS != 0
    }

    /// Convert to fuser FileAttr under the given inode number
    pub fn to_fuser_attr(&self, ino: u64) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: self.size,
            blocks: self.blocks,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            crtime: self.crtime,
            kind: self.kind.to_fuser_type(),
            perm: self.perm,
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: self.rdev,
            blksize: self.blksize,
            flags: 0,
        }
    }
}
