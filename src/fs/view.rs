//! Read-only archive view
//!
//! Answers attribute, link and listing queries for virtual paths by
//! resolving them against the suffix registry and consulting the real
//! source tree. Nothing is cached between calls.

use crate::archive::{PathResolver, SuffixRegistry};
use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::attr::{EntryAttributes, EntryKind};
use super::source::SourceTree;

/// One entry in a virtual directory listing.
///
/// `ino` is the source inode of the real entry; an alias carries the
/// inode of its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualEntry {
    /// Real entry, listed under its own name
    Real {
        name: OsString,
        kind: EntryKind,
        ino: u64,
    },
    /// Directory alias synthesized for the archive named `archive`
    Alias {
        name: OsString,
        archive: OsString,
        ino: u64,
    },
}

impl VirtualEntry {
    pub fn name(&self) -> &OsStr {
        match self {
            VirtualEntry::Real { name, .. } | VirtualEntry::Alias { name, .. } => name,
        }
    }

    pub fn ino(&self) -> u64 {
        match self {
            VirtualEntry::Real { ino, .. } | VirtualEntry::Alias { ino, .. } => *ino,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            VirtualEntry::Real { kind, .. } => *kind,
            VirtualEntry::Alias { .. } => EntryKind::Directory,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, VirtualEntry::Alias { .. })
    }
}

/// Overlay of a source tree in which archives also appear as directories
#[derive(Debug, Clone)]
pub struct ArchiveView {
    source: SourceTree,
    resolver: PathResolver,
}

impl ArchiveView {
    pub fn new(source: SourceTree, registry: Arc<SuffixRegistry>) -> Self {
        Self {
            source,
            resolver: PathResolver::new(registry),
        }
    }

    /// View over `root` using the built-in archive rules
    pub fn open(root: PathBuf) -> Result<Self> {
        Ok(Self::new(
            SourceTree::new(root)?,
            Arc::new(SuffixRegistry::builtin()?),
        ))
    }

    pub fn source(&self) -> &SourceTree {
        &self.source
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Attributes of a virtual path
    pub fn get_attributes(&self, path: &Path) -> Result<EntryAttributes> {
        let resolution = self.resolver.resolve(path);

        if let Some(last) = resolution.last().filter(|c| c.is_alias()) {
            let archive_path = last.real_path();
            debug!("{:?} is the alias of {:?}", path, archive_path);
            let archive = EntryAttributes::from_metadata(&self.source.metadata(&archive_path)?);
            return Ok(EntryAttributes::alias_directory(&archive));
        }

        let meta = self.source.symlink_metadata(&resolution.relative_path())?;
        Ok(EntryAttributes::from_metadata(&meta).read_only())
    }

    /// Target of a symlink; aliases play no part here
    pub fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let relative = self.resolver.resolve(path).relative_path();
        self.source.readlink(&relative)
    }

    /// Entries of a virtual directory, without `.` and `..`.
    ///
    /// Every real entry is listed; an archive is followed by its alias.
    /// An alias itself lists as an empty directory.
    pub fn list_directory(&self, path: &Path) -> Result<Vec<VirtualEntry>> {
        let resolution = self.resolver.resolve(path);

        if resolution.names_alias() {
            // The alias must still stand for an existing archive
            self.get_attributes(path)?;
            return Ok(Vec::new());
        }

        let relative = resolution.relative_path();
        let mut entries = Vec::new();
        for entry in self.source.readdir(&relative)? {
            let alias = self.resolver.registry().find(&entry.name);

            entries.push(VirtualEntry::Real {
                name: entry.name.clone(),
                kind: entry.kind,
                ino: entry.ino,
            });
            if let Some(m) = alias {
                entries.push(VirtualEntry::Alias {
                    name: m.exposed_name,
                    archive: entry.name,
                    ino: entry.ino,
                });
            }
        }

        debug!("list_directory({:?}) -> {} entries", path, entries.len());
        Ok(entries)
    }

    /// Read from a passthrough regular file. Aliases have no content.
    pub fn read(&self, path: &Path, offset: u64, size: u32) -> Result<Vec<u8>> {
        let resolution = self.resolver.resolve(path);
        if resolution.names_alias() {
            return Err(Error::Io(std::io::Error::from_raw_os_error(libc::EISDIR)));
        }
        self.source.read(&resolution.relative_path(), offset, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::{tempdir, TempDir};

    fn view(dir: &TempDir) -> ArchiveView {
        ArchiveView::open(dir.path().to_path_buf()).unwrap()
    }

    fn names(entries: &[VirtualEntry]) -> BTreeSet<String> {
        entries
            .iter()
            .map(|e| e.name().to_string_lossy().to_string())
            .collect()
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    /// Source with `notes.txt` and `photos.zip`
    fn scenario_a() -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"remember").unwrap();
        fs::write(dir.path().join("photos.zip"), b"PK\x03\x04").unwrap();
        set_mtime(&dir.path().join("photos.zip"), 1_600_000_000);
        fs::set_permissions(
            dir.path().join("notes.txt"),
            fs::Permissions::from_mode(0o664),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_listing_adds_aliases() {
        let dir = scenario_a();
        let entries = view(&dir).list_directory(Path::new("/")).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            names(&entries),
            ["notes.txt", "photos.zip", "photos_zip"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<_>>()
        );

        let alias = entries.iter().find(|e| e.is_alias()).unwrap();
        assert_eq!(alias.kind(), EntryKind::Directory);
        match alias {
            VirtualEntry::Alias { name, archive, .. } => {
                assert_eq!(name, "photos_zip");
                assert_eq!(archive, "photos.zip");
            }
            other => panic!("expected alias, got {:?}", other),
        }

        // The alias shares the archive's source inode
        let archive = entries.iter().find(|e| e.name() == "photos.zip").unwrap();
        assert_eq!(alias.ino(), archive.ino());
    }

    #[test]
    fn test_alias_attributes() {
        let dir = scenario_a();
        let view = view(&dir);

        let attr = view.get_attributes(Path::new("/photos_zip")).unwrap();
        assert!(attr.is_dir());
        assert!(!attr.is_writable());
        assert_eq!(attr.perm, 0o555);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.size, 0);
        assert_eq!(attr.mtime, UNIX_EPOCH + Duration::from_secs(1_600_000_000));

        // The archive itself stays a plain file
        let real = view.get_attributes(Path::new("/photos.zip")).unwrap();
        assert_eq!(real.kind, EntryKind::RegularFile);
        assert_eq!(real.size, 4);
    }

    #[test]
    fn test_passthrough_attributes_read_only() {
        let dir = scenario_a();
        let view = view(&dir);

        let attr = view.get_attributes(Path::new("/notes.txt")).unwrap();
        assert_eq!(attr.kind, EntryKind::RegularFile);
        assert_eq!(attr.perm, 0o444);
        assert!(!attr.is_writable());

        let root = view.get_attributes(Path::new("/")).unwrap();
        assert!(root.is_dir());
        assert!(!root.is_writable());
    }

    #[test]
    fn test_missing_paths_propagate_not_found() {
        let dir = scenario_a();
        let view = view(&dir);

        for path in ["/missing.txt", "/other_zip", "/photos_zip/inside.txt"] {
            let err = view.get_attributes(Path::new(path)).unwrap_err();
            assert_eq!(err.errno(), libc::ENOENT, "{}", path);
        }

        let err = view.list_directory(Path::new("/nope")).unwrap_err();
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[test]
    fn test_alias_lists_empty() {
        let dir = scenario_a();
        let view = view(&dir);

        assert!(view.list_directory(Path::new("/photos_zip")).unwrap().is_empty());
        assert!(view.list_directory(Path::new("/other_zip")).is_err());
    }

    #[test]
    fn test_listing_nested_and_case() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("backups");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("backup.tar.gz"), b"").unwrap();
        fs::write(sub.join("Comic.CBZ"), b"").unwrap();
        fs::write(sub.join("readme"), b"").unwrap();

        let view = view(&dir);
        let entries = view.list_directory(Path::new("/backups")).unwrap();

        assert_eq!(entries.len(), 3 + 2);
        assert!(names(&entries).contains("backup_tar_gz"));
        assert!(names(&entries).contains("Comic_CBZ"));

        let attr = view.get_attributes(Path::new("/backups/Comic_CBZ")).unwrap();
        assert!(attr.is_dir());
    }

    #[test]
    fn test_read_link() {
        let dir = scenario_a();
        std::os::unix::fs::symlink("photos.zip", dir.path().join("latest.zip")).unwrap();
        let view = view(&dir);

        assert_eq!(
            view.read_link(Path::new("/latest.zip")).unwrap(),
            PathBuf::from("photos.zip")
        );

        // Link attributes are the link's own, not the target's
        let attr = view.get_attributes(Path::new("/latest.zip")).unwrap();
        assert_eq!(attr.kind, EntryKind::Symlink);

        // The link's alias borrows from the archive it points to
        let alias = view.get_attributes(Path::new("/latest_zip")).unwrap();
        assert!(alias.is_dir());

        assert_eq!(
            view.read_link(Path::new("/notes.txt")).unwrap_err().errno(),
            libc::EINVAL
        );
        assert_eq!(
            view.read_link(Path::new("/photos_zip")).unwrap_err().errno(),
            libc::ENOENT
        );
    }

    #[test]
    fn test_read_passthrough() {
        let dir = scenario_a();
        let view = view(&dir);

        assert_eq!(view.read(Path::new("/notes.txt"), 0, 64).unwrap(), b"remember");
        assert_eq!(
            view.read(Path::new("/photos_zip"), 0, 64).unwrap_err().errno(),
            libc::EISDIR
        );
    }

    #[test]
    fn test_listing_non_utf8_archive() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.zip")), b"PK").unwrap();
        fs::write(dir.path().join("ok.zip"), b"PK").unwrap();

        let view = view(&dir);
        let entries = view.list_directory(Path::new("/")).unwrap();
        assert_eq!(entries.len(), 4);

        let alias = OsStr::from_bytes(b"caf\xe9_zip");
        assert!(entries.iter().any(|e| e.is_alias() && e.name() == alias));

        let attr = view.get_attributes(&Path::new("/").join(alias)).unwrap();
        assert!(attr.is_dir());
    }
}
