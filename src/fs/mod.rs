//! FUSE filesystem implementation
//!
//! Serves the archive view: the real source tree, read-only, with a
//! directory alias next to every recognized archive file.

mod attr;
mod filesystem;
mod handle;
mod inode;
mod source;
mod view;

pub use attr::{EntryAttributes, EntryKind, ALIAS_DIR_PERM, WRITE_BITS};
pub use filesystem::ArchiveFs;
pub use handle::{FileHandle, HandleTable};
pub use inode::{InodeTable, ROOT_INO};
pub use source::{SourceDirEntry, SourceTree};
pub use view::{ArchiveView, VirtualEntry};
