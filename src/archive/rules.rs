//! Archive suffix rules
//!
//! Each rule recognizes one family of archive file names and splits a
//! matching name into a free-form prefix and a dotted (or underscored)
//! suffix. Only the suffix is ever rewritten:
//!
//! - `foo.bar.tar.gz` <-> `foo.bar_tar_gz`
//! - `foo_bar.tAr.GZ` <-> `foo_bar_tAr_GZ`
//!
//! Suffixes that mix separators (`foobar.tar_gz`) still produce a match,
//! but which real name they map back to is left unspecified.
//!
//! Names are matched as raw bytes, so a prefix that is not valid UTF-8
//! is carried through untouched.

use crate::error::{Error, Result};
use regex::bytes::{Regex, RegexBuilder};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Zip-like archives
const ZIP_PATTERN: &str = r"^(?P<prefix>.*)(?P<suffix>[._](zip|cbz))$";

/// Tar archives, plain or compressed
const TAR_PATTERN: &str = r"(?x)
    ^
    (?P<prefix>.*)
    (?P<suffix>
        [._](tar|tgz|tbz2|txz)
        |
        [._]tar[._](gz|bz2|xz)
    )
    $
";

/// Archive family a rule recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFamily {
    Zip,
    Tar,
}

impl ArchiveFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveFamily::Zip => "zip",
            ArchiveFamily::Tar => "tar",
        }
    }
}

impl fmt::Display for ArchiveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn swap_byte(bytes: &[u8], from: u8, to: u8) -> Vec<u8> {
    bytes
        .iter()
        .map(|&b| if b == from { to } else { b })
        .collect()
}

/// Dotted suffix form, as the archive file carries it
pub fn underscores_to_dots(suffix: &[u8]) -> Vec<u8> {
    swap_byte(suffix, b'_', b'.')
}

/// Underscored suffix form, as the directory alias carries it
pub fn dots_to_underscores(suffix: &[u8]) -> Vec<u8> {
    swap_byte(suffix, b'.', b'_')
}

/// Result of a successful rule match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerMatch {
    /// Family of the rule that matched
    pub family: ArchiveFamily,
    /// Name of the real archive file
    pub real_name: OsString,
    /// Name of the synthesized directory alias
    pub exposed_name: OsString,
}

impl HandlerMatch {
    /// Whether `name` is the alias side of this match
    pub fn is_alias(&self, name: &OsStr) -> bool {
        self.exposed_name == name
    }
}

/// One archive name recognizer
#[derive(Debug, Clone)]
pub struct SuffixRule {
    family: ArchiveFamily,
    pattern: Regex,
}

impl SuffixRule {
    /// Compile a rule. The pattern must define `prefix` and `suffix` groups.
    pub fn new(family: ArchiveFamily, pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .unicode(false)
            .build()
            .map_err(|e| Error::Internal(format!("bad {} suffix pattern: {}", family, e)))?;

        let names: Vec<_> = pattern.capture_names().flatten().collect();
        if !names.contains(&"prefix") || !names.contains(&"suffix") {
            return Err(Error::Internal(format!(
                "{} suffix pattern lacks prefix/suffix groups",
                family
            )));
        }

        Ok(Self { family, pattern })
    }

    pub fn family(&self) -> ArchiveFamily {
        self.family
    }

    /// Test a single file name against this rule
    pub fn matches(&self, name: &OsStr) -> Option<HandlerMatch> {
        let caps = self.pattern.captures(name.as_bytes())?;
        let prefix = caps.name("prefix")?.as_bytes();
        let suffix = caps.name("suffix")?.as_bytes();

        let join = |tail: Vec<u8>| OsString::from_vec([prefix, tail.as_slice()].concat());
        Some(HandlerMatch {
            family: self.family,
            real_name: join(underscores_to_dots(suffix)),
            exposed_name: join(dots_to_underscores(suffix)),
        })
    }
}

/// Ordered, immutable set of suffix rules
///
/// The first rule that matches wins. A name no rule matches is a plain
/// passthrough entry.
#[derive(Debug, Clone)]
pub struct SuffixRegistry {
    rules: Vec<SuffixRule>,
}

impl SuffixRegistry {
    /// Registry with the built-in zip and tar families, in that order
    pub fn builtin() -> Result<Self> {
        Ok(Self::with_rules(vec![
            SuffixRule::new(ArchiveFamily::Zip, ZIP_PATTERN)?,
            SuffixRule::new(ArchiveFamily::Tar, TAR_PATTERN)?,
        ]))
    }

    pub fn with_rules(rules: Vec<SuffixRule>) -> Self {
        Self { rules }
    }

    /// Match a single path component name
    pub fn find<S: AsRef<OsStr>>(&self, name: S) -> Option<HandlerMatch> {
        let name = name.as_ref();
        self.rules.iter().find_map(|rule| rule.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SuffixRegistry {
        SuffixRegistry::builtin().unwrap()
    }

    fn pair(m: Option<HandlerMatch>) -> Option<(OsString, OsString)> {
        m.map(|m| (m.real_name, m.exposed_name))
    }

    #[test]
    fn test_zip_family() {
        let reg = registry();

        let m = reg.find("archive.cbz").unwrap();
        assert_eq!(m.family, ArchiveFamily::Zip);
        assert_eq!(m.real_name, "archive.cbz");
        assert_eq!(m.exposed_name, "archive_cbz");

        assert_eq!(
            pair(reg.find("photos_zip")),
            Some(("photos.zip".into(), "photos_zip".into()))
        );
    }

    #[test]
    fn test_tar_family() {
        let reg = registry();

        let m = reg.find("backup.tar.gz").unwrap();
        assert_eq!(m.family, ArchiveFamily::Tar);
        assert_eq!(m.real_name, "backup.tar.gz");
        assert_eq!(m.exposed_name, "backup_tar_gz");

        for (real, alias) in [
            ("a.tar", "a_tar"),
            ("a.tgz", "a_tgz"),
            ("a.tbz2", "a_tbz2"),
            ("a.txz", "a_txz"),
            ("a.tar.bz2", "a_tar_bz2"),
            ("a.tar.xz", "a_tar_xz"),
        ] {
            assert_eq!(pair(reg.find(real)), Some((real.into(), alias.into())));
            assert_eq!(pair(reg.find(alias)), Some((real.into(), alias.into())));
        }
    }

    #[test]
    fn test_prefix_untouched() {
        let reg = registry();

        assert_eq!(
            pair(reg.find("foo.bar.tar.gz")),
            Some(("foo.bar.tar.gz".into(), "foo.bar_tar_gz".into()))
        );
        assert_eq!(
            pair(reg.find("foo.bar_tar_gz")),
            Some(("foo.bar.tar.gz".into(), "foo.bar_tar_gz".into()))
        );
        assert_eq!(
            pair(reg.find("my_photos.zip")),
            Some(("my_photos.zip".into(), "my_photos_zip".into()))
        );
    }

    #[test]
    fn test_case_insensitive() {
        let reg = registry();

        assert_eq!(
            pair(reg.find("a.ZIP")),
            Some(("a.ZIP".into(), "a_ZIP".into()))
        );
        assert_eq!(pair(reg.find("a.zip")), Some(("a.zip".into(), "a_zip".into())));
        assert_eq!(
            pair(reg.find("foo_bar.tAr.GZ")),
            Some(("foo_bar.tAr.GZ".into(), "foo_bar_tAr_GZ".into()))
        );
    }

    #[test]
    fn test_non_archives() {
        let reg = registry();

        for name in ["notes.txt", "zip", ".zip.bak", "tar.gz.txt", "archive.gz", "", "a.tarxz"] {
            assert!(reg.find(name).is_none(), "{:?} should not match", name);
        }
    }

    #[test]
    fn test_bare_suffix() {
        // An empty prefix is still a match
        assert_eq!(
            pair(registry().find(".zip")),
            Some((".zip".into(), "_zip".into()))
        );
    }

    #[test]
    fn test_mixed_separators_do_not_fault() {
        let reg = registry();

        for name in ["foobar.tar_gz", "foobar_tar.gz", "x._zip", "a_.tar"] {
            // Any outcome is acceptable as long as it is deterministic
            assert_eq!(reg.find(name), reg.find(name));
        }

        let m = reg.find("foobar.tar_gz").unwrap();
        assert_ne!(m.exposed_name, "foobar.tar_gz");
    }

    #[test]
    fn test_suffix_transforms_invert() {
        for dotted in [".zip", ".cbz", ".tar", ".tgz", ".tar.gz", ".tar.bz2", ".tar.xz"] {
            let dotted = dotted.as_bytes();
            assert_eq!(underscores_to_dots(&dots_to_underscores(dotted)), dotted);
        }
        for underscored in ["_zip", "_cbz", "_tbz2", "_tar_gz", "_tar_xz"] {
            let underscored = underscored.as_bytes();
            assert_eq!(dots_to_underscores(&underscores_to_dots(underscored)), underscored);
        }
    }

    #[test]
    fn test_first_rule_wins() {
        let first =
            SuffixRule::new(ArchiveFamily::Tar, r"^(?P<prefix>.*)(?P<suffix>\.zip)$").unwrap();
        let zip = SuffixRule::new(ArchiveFamily::Zip, ZIP_PATTERN).unwrap();
        let reg = SuffixRegistry::with_rules(vec![first, zip]);

        assert_eq!(reg.find("a.zip").unwrap().family, ArchiveFamily::Tar);
        assert_eq!(reg.find("a.cbz").unwrap().family, ArchiveFamily::Zip);
    }

    #[test]
    fn test_rule_requires_groups() {
        assert!(SuffixRule::new(ArchiveFamily::Zip, r"^.*\.zip$").is_err());
        assert!(SuffixRule::new(ArchiveFamily::Zip, r"(unclosed").is_err());
    }

    #[test]
    fn test_non_utf8_prefix_matches() {
        let reg = registry();

        let m = reg.find(OsStr::from_bytes(b"caf\xe9.zip")).unwrap();
        assert_eq!(m.family, ArchiveFamily::Zip);
        assert_eq!(m.real_name.as_bytes(), b"caf\xe9.zip");
        assert_eq!(m.exposed_name.as_bytes(), b"caf\xe9_zip");

        let m = reg.find(OsStr::from_bytes(b"\xff\xfe_TAR_GZ")).unwrap();
        assert_eq!(m.real_name.as_bytes(), b"\xff\xfe.TAR.GZ");

        assert!(reg.find(OsStr::from_bytes(b"caf\xe9.txt")).is_none());
    }
}
