//! FUSE filesystem implementation
//!
//! Thin translation from kernel requests to the path-based archive view.

use fuser::{
    Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, Request,
};
use libc::{EISDIR, ENOENT, ENOTDIR};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    attr::EntryKind,
    handle::{wants_write, HandleTable},
    inode::InodeTable,
    view::ArchiveView,
};
use crate::config::Config;
use crate::error::Error;

/// Read-only FUSE filesystem over an archive view
pub struct ArchiveFs {
    view: ArchiveView,
    inodes: InodeTable,
    handles: HandleTable,
    ttl: Duration,
}

impl ArchiveFs {
    pub fn new(view: ArchiveView, config: &Config) -> Self {
        Self {
            view,
            inodes: InodeTable::new(),
            handles: HandleTable::new(),
            ttl: config.attr_ttl(),
        }
    }

    fn path_of(&self, ino: u64) -> Option<PathBuf> {
        self.inodes.path(ino)
    }
}

impl Filesystem for ArchiveFs {
    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup(parent={}, name={:?})", parent, name);

        let path = match self.inodes.child_path(parent, name) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.view.get_attributes(&path) {
            Ok(attrs) => {
                let ino = self.inodes.lookup(&path);
                reply.entry(&self.ttl, &attrs.to_fuser_attr(ino), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn forget(&mut self, _req: &Request, ino: u64, nlookup: u64) {
        debug!("forget(ino={}, nlookup={})", ino, nlookup);
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        debug!("getattr(ino={})", ino);

        let path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.view.get_attributes(&path) {
            Ok(attrs) => reply.attr(&self.ttl, &attrs.to_fuser_attr(ino)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        debug!("readlink(ino={})", ino);

        let path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.view.read_link(&path) {
            Ok(target) => reply.data(target.as_os_str().as_encoded_bytes()),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir(ino={}, offset={})", ino, offset);

        let path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        let listing = match self.view.list_directory(&path) {
            Ok(listing) => listing,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        let mut entries = vec![
            (ino, EntryKind::Directory, OsStr::new(".").to_os_string()),
            (
                self.inodes.parent_of(ino),
                EntryKind::Directory,
                OsStr::new("..").to_os_string(),
            ),
        ];
        // Numbers are only handed out on lookup; unseen entries report
        // their source inode
        for entry in listing {
            let child_ino = self
                .inodes
                .get(&path.join(entry.name()))
                .unwrap_or(entry.ino());
            entries.push((child_ino, entry.kind(), entry.name().to_os_string()));
        }

        for (i, (child_ino, kind, name)) in entries.iter().enumerate().skip(offset as usize) {
            let buffer_full = reply.add(*child_ino, (i + 1) as i64, kind.to_fuser_type(), name);
            if buffer_full {
                break;
            }
        }

        reply.ok();
    }

    fn opendir(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("opendir(ino={}, flags={})", ino, flags);

        let path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.view.get_attributes(&path) {
            Ok(attrs) if attrs.is_dir() => reply.opened(0, 0),
            Ok(_) => reply.error(ENOTDIR),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open(ino={}, flags={})", ino, flags);

        if wants_write(flags) {
            reply.error(Error::ReadOnly.errno());
            return;
        }

        let path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.view.get_attributes(&path) {
            Ok(attrs) if attrs.is_dir() => reply.error(EISDIR),
            Ok(_) => {
                let fh = self.handles.open(ino, path, flags);
                reply.opened(fh, 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read(ino={}, fh={}, offset={}, size={})", ino, fh, offset, size);

        let handle = match self.handles.get(fh) {
            Some(h) => h,
            None => {
                reply.error(libc::EBADF);
                return;
            }
        };

        match self.view.read(&handle.path, offset.max(0) as u64, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                warn!("read of {:?} failed: {}", handle.path, e);
                reply.error(e.errno());
            }
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!("release(ino={}, fh={})", ino, fh);
        self.handles.close(fh);
        reply.ok();
    }

    fn access(&mut self, _req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
        debug!("access(ino={}, mask={})", ino, mask);

        if mask & libc::W_OK != 0 {
            reply.error(Error::ReadOnly.errno());
            return;
        }

        let path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(ENOENT);
                return;
            }
        };

        match self.view.get_attributes(&path) {
            Ok(_) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        match self.view.source().statvfs() {
            Ok(st) => reply.statfs(
                st.blocks() as u64,
                st.blocks_free() as u64,
                st.blocks_available() as u64,
                st.files() as u64,
                st.files_free() as u64,
                st.block_size() as u32,
                st.name_max() as u32,
                st.fragment_size() as u32,
            ),
            Err(e) => {
                warn!("statfs of source failed: {}", e);
                reply.error(e.errno());
            }
        }
    }
}
