//! Filesystem enumeration of media files

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use vuvur_core::MediaKind;
use walkdir::WalkDir;

/// A media file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Path as found under its root
    pub path: PathBuf,

    /// `path` as UTF-8 (index key)
    pub key: String,

    /// File name component
    pub filename: String,

    /// Kind derived from the extension
    pub kind: MediaKind,

    /// Top-level subdirectory under the root, if the file is not at the top
    pub group_tag: Option<String>,
}

/// Walks media roots for files with a recognized extension
///
/// The recycle-bin subtree is pruned from the walk, so files moved there
/// disappear from the enumeration. Entries that vanish or cannot be read
/// mid-walk are skipped. Symlinked files are yielded under the link's path
/// even when directory links are not followed.
#[derive(Debug, Clone)]
pub struct DiskEnumerator {
    roots: Vec<PathBuf>,
    recycle_bin: Option<PathBuf>,
    follow_links: bool,
}

impl DiskEnumerator {
    /// Create an enumerator over `roots`
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            recycle_bin: None,
            follow_links: false,
        }
    }

    /// Exclude everything under `path`
    pub fn exclude_recycle_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.recycle_bin = Some(path.into());
        self
    }

    /// Set whether to follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Configured roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Lazily walk every root
    ///
    /// Each call starts a fresh walk. Files reachable from more than one root
    /// are yielded once per root; use `enumerate` for a deduplicated set.
    pub fn iter(&self) -> impl Iterator<Item = DiscoveredFile> + '_ {
        self.roots.iter().flat_map(move |root| {
            let recycle_bin = self.recycle_bin.as_deref();
            WalkDir::new(root)
                .follow_links(self.follow_links)
                .into_iter()
                .filter_entry(move |entry| {
                    recycle_bin.map_or(true, |bin| !entry.path().starts_with(bin))
                })
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::debug!("Skipping unreadable entry: {}", e);
                        None
                    }
                })
                // Symlinks to regular files count; dangling ones do not
                .filter(|entry| {
                    entry.file_type().is_file()
                        || (entry.path_is_symlink() && entry.path().is_file())
                })
                .filter_map(move |entry| discover(root, entry.into_path()))
        })
    }

    /// Walk every root into a set keyed by path
    ///
    /// When roots overlap, the first root that reaches a file decides its
    /// group tag.
    pub fn enumerate(&self) -> BTreeMap<String, DiscoveredFile> {
        let mut found = BTreeMap::new();
        for file in self.iter() {
            found.entry(file.key.clone()).or_insert(file);
        }
        found
    }
}

fn discover(root: &Path, path: PathBuf) -> Option<DiscoveredFile> {
    let kind = MediaKind::from_path(&path)?;

    let Some(key) = path.to_str().map(str::to_string) else {
        tracing::warn!("Skipping non UTF-8 path: {}", path.display());
        return None;
    };

    let filename = path.file_name()?.to_str()?.to_string();
    let group_tag = group_tag(root, &path);

    Some(DiscoveredFile {
        path,
        key,
        filename,
        kind,
        group_tag,
    })
}

/// First directory component of `path` below `root`
///
/// Files directly in the root have no group.
pub fn group_tag(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;

    // Need at least one more component (the file itself)
    components.next()?;

    match first {
        Component::Normal(name) => name.to_str().map(str::to_string),
        _ => None,
    }
}
