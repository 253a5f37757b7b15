//! Immutable in-memory file trees.
//!
//! A snapshot holds the files of one version's content directory, keyed by
//! path relative to that directory. Paths are stored without a leading `/`;
//! lookups accept either form.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// File extension of content pages.
pub const PAGE_EXTENSION: &str = ".md";

/// Name of the page served for a directory path.
pub const INDEX_PAGE: &str = "index.md";

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DirEntry {
    /// Base name of the entry.
    pub name: String,
    /// Path relative to the snapshot root.
    pub path: String,
    pub is_dir: bool,
    /// File size in bytes; `None` for directories.
    pub size: Option<usize>,
}

/// An immutable file tree built from one archive download.
#[derive(Debug, Clone)]
pub struct Snapshot {
    files: BTreeMap<String, Vec<u8>>,
    source: String,
    root: String,
    fetched_at: DateTime<Utc>,
    total_bytes: usize,
}

impl Snapshot {
    /// Build a snapshot from path → bytes pairs.
    ///
    /// `source` is the URL the files came from and `root` the directory
    /// prefix they were found under.
    pub fn new(source: impl Into<String>, root: impl Into<String>, files: BTreeMap<String, Vec<u8>>) -> Self {
        let files: BTreeMap<String, Vec<u8>> = files
            .into_iter()
            .filter_map(|(path, data)| normalize(&path).filter(|p| !p.is_empty()).map(|p| (p, data)))
            .collect();
        let total_bytes = files.values().map(Vec::len).sum();

        Self { files, source: source.into(), root: root.into(), fetched_at: Utc::now(), total_bytes }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Sum of all file sizes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All file paths in sorted order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Read the file at `path`.
    pub fn open(&self, path: &str) -> Result<&[u8], Error> {
        normalize(path)
            .and_then(|p| self.files.get(&p))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::NotFound(format!("open {path}: file does not exist")))
    }

    /// Whether `path` names a directory. The root is always a directory.
    pub fn is_dir(&self, path: &str) -> bool {
        match normalize(path) {
            Some(p) if p.is_empty() => true,
            Some(p) => self.children(&format!("{p}/")).next().is_some(),
            None => false,
        }
    }

    /// List the entries directly inside the directory at `path`, sorted by name.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, Error> {
        let not_found = || Error::NotFound(format!("read_dir {path}: directory does not exist"));
        let dir = normalize(path).ok_or_else(not_found)?;
        let prefix = if dir.is_empty() { String::new() } else { format!("{dir}/") };

        let mut entries: BTreeMap<&str, DirEntry> = BTreeMap::new();
        for (key, data) in self.children(&prefix) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((name, _)) => {
                    entries.entry(name).or_insert_with(|| DirEntry {
                        name: name.to_string(),
                        path: format!("{prefix}{name}"),
                        is_dir: true,
                        size: None,
                    });
                }
                None => {
                    entries.insert(
                        rest,
                        DirEntry { name: rest.to_string(), path: key.clone(), is_dir: false, size: Some(data.len()) },
                    );
                }
            }
        }

        if entries.is_empty() && !dir.is_empty() {
            return Err(not_found());
        }
        Ok(entries.into_values().collect())
    }

    /// Map a page path (as found in a URL) to a file and its contents.
    ///
    /// Tries the exact file, then `path.md`, then `path/index.md`. The empty
    /// path resolves to the root `index.md`.
    pub fn resolve_page(&self, path: &str) -> Result<(String, &[u8]), Error> {
        let page = normalize(path).ok_or_else(|| Error::NotFound(format!("page {path} does not exist")))?;

        let candidates = if page.is_empty() {
            vec![INDEX_PAGE.to_string()]
        } else {
            vec![page.clone(), format!("{page}{PAGE_EXTENSION}"), format!("{page}/{INDEX_PAGE}")]
        };

        candidates
            .into_iter()
            .find_map(|candidate| self.files.get(&candidate).map(|data| (candidate, data.as_slice())))
            .ok_or_else(|| Error::NotFound(format!("page {path} does not exist")))
    }

    fn children<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a String, &'a Vec<u8>)> + 'a {
        self.files
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
    }
}

/// Clean a lookup path: drop empty and `.` components, strip slashes.
///
/// Returns `None` for paths containing `..`.
fn normalize(path: &str) -> Option<String> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(files: &[(&str, &str)]) -> Snapshot {
        let files = files
            .iter()
            .map(|(path, data)| (path.to_string(), data.as_bytes().to_vec()))
            .collect();
        Snapshot::new("https://example.com/main.zip", "docs/", files)
    }

    fn sample() -> Snapshot {
        snapshot(&[
            ("index.md", "# Home"),
            ("a/b.md", "# B"),
            ("a/c/d.md", "# D"),
            ("a/c/index.md", "# C"),
            ("a.md", "# A"),
            ("img/logo.png", "png"),
        ])
    }

    #[test]
    fn test_open_with_and_without_leading_slash() {
        let snap = sample();
        assert_eq!(snap.open("/a/b.md").unwrap(), b"# B");
        assert_eq!(snap.open("a/b.md").unwrap(), b"# B");
        assert_eq!(snap.open("./a//b.md").unwrap(), b"# B");
    }

    #[test]
    fn test_open_missing() {
        let snap = sample();
        assert!(matches!(snap.open("/nope.md"), Err(Error::NotFound(_))));
        assert!(matches!(snap.open("/a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_open_rejects_parent_components() {
        let snap = sample();
        assert!(matches!(snap.open("/a/../index.md"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_new_normalizes_keys() {
        let snap = snapshot(&[("/x.md", "x"), ("", "dropped")]);
        assert_eq!(snap.files().collect::<Vec<_>>(), vec!["x.md"]);
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_metadata() {
        let snap = sample();
        assert_eq!(snap.source(), "https://example.com/main.zip");
        assert_eq!(snap.root(), "docs/");
        assert_eq!(snap.total_bytes(), 6 + 3 + 3 + 3 + 3 + 3);
        assert!(!snap.is_empty());
    }

    #[test]
    fn test_is_dir() {
        let snap = sample();
        assert!(snap.is_dir(""));
        assert!(snap.is_dir("/"));
        assert!(snap.is_dir("a"));
        assert!(snap.is_dir("/a/c/"));
        assert!(!snap.is_dir("a/b.md"));
        assert!(!snap.is_dir("missing"));
    }

    #[test]
    fn test_read_dir_root() {
        let snap = sample();
        let entries = snap.read_dir("/").unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.is_dir)).collect();
        assert_eq!(names, vec![("a", true), ("a.md", false), ("img", true), ("index.md", false)]);
    }

    #[test]
    fn test_read_dir_nested() {
        let snap = sample();
        let entries = snap.read_dir("a").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], DirEntry { name: "b.md".into(), path: "a/b.md".into(), is_dir: false, size: Some(3) });
        assert_eq!(entries[1], DirEntry { name: "c".into(), path: "a/c".into(), is_dir: true, size: None });
    }

    #[test]
    fn test_read_dir_missing() {
        let snap = sample();
        assert!(matches!(snap.read_dir("zzz"), Err(Error::NotFound(_))));
        assert!(matches!(snap.read_dir("a/b.md"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_read_dir_empty_snapshot_root() {
        let snap = snapshot(&[]);
        assert!(snap.read_dir("").unwrap().is_empty());
    }

    #[test]
    fn test_resolve_page() {
        let snap = sample();
        assert_eq!(snap.resolve_page("").unwrap().0, "index.md");
        assert_eq!(snap.resolve_page("/a").unwrap().0, "a.md");
        assert_eq!(snap.resolve_page("a/b").unwrap().0, "a/b.md");
        assert_eq!(snap.resolve_page("a/b.md").unwrap().0, "a/b.md");
        assert_eq!(snap.resolve_page("a/c").unwrap().0, "a/c/index.md");
        assert_eq!(snap.resolve_page("a/c/").unwrap().1, b"# C");
    }

    #[test]
    fn test_resolve_page_missing() {
        let snap = sample();
        assert!(matches!(snap.resolve_page("a/zzz"), Err(Error::NotFound(_))));
    }
}
