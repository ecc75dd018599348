//! Naming rules shared by extraction and packing.
//!
//! Archive names are slash-separated and relative to the archive root; on
//! disk they map to paths below the working tree root.

use crate::error::OptimizeError;
use std::path::{Component, Path, PathBuf};

/// Name of the ODF media type file, which must lead the archive
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// One entry of the working tree, ready to be written to an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Slash-separated path relative to the tree root
    pub name: String,
    pub is_dir: bool,
    /// Where the content lives on disk
    pub source: PathBuf,
}

impl ArchiveEntry {
    /// Build the entry for `path` found under `root`.
    /// Returns `None` for the root itself, whose relative name is empty.
    pub fn from_tree(root: &Path, path: &Path, is_dir: bool) -> Option<Self> {
        let relative = path.strip_prefix(root).ok()?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if name.is_empty() {
            return None;
        }

        Some(Self {
            name,
            is_dir,
            source: path.to_path_buf(),
        })
    }

    /// Name as stored in the archive: directories carry a trailing slash
    pub fn archive_name(&self) -> String {
        if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn is_mimetype(&self) -> bool {
        !self.is_dir && self.name == MIMETYPE_ENTRY
    }
}

/// Resolve an archive entry name against `dest_root`.
///
/// Absolute names, drive prefixes and `..` segments are rejected so that no
/// entry can land outside the destination. `.` segments are dropped.
pub fn resolve_entry_path(dest_root: &Path, name: &str) -> Result<PathBuf, OptimizeError> {
    let mut relative = PathBuf::new();

    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(OptimizeError::UnsafeEntryPath(name.to_string()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(OptimizeError::UnsafeEntryPath(name.to_string()));
    }

    Ok(dest_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_and_nested_names() {
        let root = Path::new("/tmp/tree");
        assert_eq!(
            resolve_entry_path(root, "content.xml").unwrap(),
            PathBuf::from("/tmp/tree/content.xml")
        );
        assert_eq!(
            resolve_entry_path(root, "Pictures/").unwrap(),
            PathBuf::from("/tmp/tree/Pictures")
        );
        assert_eq!(
            resolve_entry_path(root, "./META-INF/manifest.xml").unwrap(),
            PathBuf::from("/tmp/tree/META-INF/manifest.xml")
        );
    }

    #[test]
    fn test_resolve_rejects_escaping_names() {
        let root = Path::new("/tmp/tree");
        for name in ["../evil.sh", "Pictures/../../evil", "/etc/passwd", "", "./"] {
            assert!(
                matches!(
                    resolve_entry_path(root, name),
                    Err(OptimizeError::UnsafeEntryPath(_))
                ),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn test_from_tree_relativizes_with_slashes() {
        let root = Path::new("/tmp/tree");
        let entry =
            ArchiveEntry::from_tree(root, Path::new("/tmp/tree/Pictures/a.png"), false).unwrap();
        assert_eq!(entry.name, "Pictures/a.png");
        assert_eq!(entry.archive_name(), "Pictures/a.png");

        let dir = ArchiveEntry::from_tree(root, Path::new("/tmp/tree/Pictures"), true).unwrap();
        assert_eq!(dir.archive_name(), "Pictures/");
        assert!(!dir.is_mimetype());

        assert!(ArchiveEntry::from_tree(root, root, true).is_none());
    }

    #[test]
    fn test_mimetype_detection() {
        let root = Path::new("/tmp/tree");
        let entry = ArchiveEntry::from_tree(root, Path::new("/tmp/tree/mimetype"), false).unwrap();
        assert!(entry.is_mimetype());
        let nested =
            ArchiveEntry::from_tree(root, Path::new("/tmp/tree/Pictures/mimetype"), false).unwrap();
        assert!(!nested.is_mimetype());
    }
}
