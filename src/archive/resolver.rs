//! Virtual path resolution
//!
//! Walks a virtual path one component at a time and records what the
//! suffix registry says about each component. Pure: no filesystem access.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::rules::{HandlerMatch, SuffixRegistry};

/// Resolution of a single path component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentResolution {
    /// Path from the root up to and including this component
    pub accumulated_path: PathBuf,
    /// The component as it appeared in the request
    pub component: OsString,
    /// Registry match for this component, if any
    pub matched: Option<HandlerMatch>,
}

impl ComponentResolution {
    /// The component names a directory alias rather than a real entry
    pub fn is_alias(&self) -> bool {
        self.matched
            .as_ref()
            .map(|m| m.is_alias(&self.component))
            .unwrap_or(false)
    }

    /// The component names a real archive file (matched, not entered)
    pub fn is_archive_file(&self) -> bool {
        self.matched.is_some() && !self.is_alias()
    }

    pub fn real_name(&self) -> Option<&OsStr> {
        self.matched.as_ref().map(|m| m.real_name.as_os_str())
    }

    pub fn exposed_name(&self) -> Option<&OsStr> {
        self.matched.as_ref().map(|m| m.exposed_name.as_os_str())
    }

    /// Source-relative path of the entry backing this component.
    ///
    /// For an alias this is the archive file next to it; otherwise the
    /// accumulated path itself.
    pub fn real_path(&self) -> PathBuf {
        match (&self.matched, self.is_alias()) {
            (Some(m), true) => self.accumulated_path.with_file_name(&m.real_name),
            _ => self.accumulated_path.clone(),
        }
    }
}

/// Ordered per-component resolution of one request path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    components: Vec<ComponentResolution>,
}

impl Resolution {
    pub fn components(&self) -> &[ComponentResolution] {
        &self.components
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn last(&self) -> Option<&ComponentResolution> {
        self.components.last()
    }

    /// Source-relative path of the whole request (empty for the root)
    pub fn relative_path(&self) -> PathBuf {
        self.last()
            .map(|c| c.accumulated_path.clone())
            .unwrap_or_default()
    }

    /// The final component is an alias
    pub fn names_alias(&self) -> bool {
        self.last().map(|c| c.is_alias()).unwrap_or(false)
    }
}

/// Resolves virtual paths against a suffix registry
#[derive(Debug, Clone)]
pub struct PathResolver {
    registry: Arc<SuffixRegistry>,
}

impl PathResolver {
    pub fn new(registry: Arc<SuffixRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SuffixRegistry {
        &self.registry
    }

    /// Resolve a virtual path. Leading separators and `.` components are
    /// dropped; `..` removes the previous component and stops at the root.
    pub fn resolve(&self, path: &Path) -> Resolution {
        let mut accumulated = PathBuf::new();
        let mut components = Vec::new();

        for part in path.components() {
            let name: &OsStr = match part {
                Component::Normal(name) => name,
                Component::ParentDir => {
                    if components.pop().is_some() {
                        accumulated.pop();
                    }
                    continue;
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => continue,
            };

            accumulated.push(name);
            components.push(ComponentResolution {
                accumulated_path: accumulated.clone(),
                component: name.to_os_string(),
                matched: self.registry.find(name),
            });
        }

        Resolution { components }
    }
}
