//! archivefs - Browse archive files as directories
//!
//! This library provides a read-only FUSE overlay of a source directory in
//! which every zip, cbz or tar archive also appears under a directory-like
//! alias (`photos.zip` -> `photos_zip`).

pub mod archive;
pub mod config;
pub mod error;
pub mod fs;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archive::{HandlerMatch, PathResolver, SuffixRegistry};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::fs::{ArchiveFs, ArchiveView};
}
