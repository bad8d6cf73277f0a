//! Archive name recognition and path resolution
//!
//! Pure translation layer between the real source tree and the virtual
//! view in which archives also appear as directories.

mod resolver;
mod rules;

pub use resolver::{ComponentResolution, PathResolver, Resolution};
pub use rules::{
    dots_to_underscores, underscores_to_dots, ArchiveFamily, HandlerMatch, SuffixRegistry,
    SuffixRule,
};
