//! Zip archive extraction into snapshots.
//!
//! Only entries under the target directory are kept, with the directory
//! prefix stripped. Symlinks are dereferenced against the same archive;
//! links whose target is missing are skipped.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use docshelf_core::Snapshot;
use docshelf_core::version::WILDCARD_DIR;
use zip::ZipArchive;
use zip::result::ZipError;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Error type for archive extraction failures.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid zip archive: {0}")]
    Zip(#[from] ZipError),

    #[error("read {name:?}: {source}")]
    Read { name: String, source: std::io::Error },

    #[error("dereferencing symlink at {name:?}: {source}")]
    Symlink { name: String, source: ZipError },
}

impl From<ArchiveError> for docshelf_core::Error {
    fn from(err: ArchiveError) -> Self {
        docshelf_core::Error::ArchiveParse(err.to_string())
    }
}

/// Extract the files under `dir` from a zip archive held in memory.
///
/// `dir` may start with `*/`, which stands for the top-level directory of
/// the archive's first entry. An empty `dir` keeps the whole archive.
pub fn extract(source: &str, body: impl AsRef<[u8]>, dir: &str) -> Result<Snapshot, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(body))?;
    let prefix = expand_wildcard(&archive, dir);

    let mut files = BTreeMap::new();
    for index in 0..archive.len() {
        // Entries outside the prefix are never opened.
        let Some(name) = archive.name_for_index(index) else {
            continue;
        };
        if !name.starts_with(&prefix) || name.ends_with('/') {
            continue;
        }
        let name = name.to_string();

        let (data, is_symlink) = {
            let mut entry = archive.by_index(index)?;
            let is_symlink = entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK);
            let data = read_entry(&mut entry, &name)?;
            (data, is_symlink)
        };

        let data = if is_symlink {
            let target = String::from_utf8_lossy(&data);
            match resolve_link(&name, &target) {
                Some(target_path) => match read_by_name(&mut archive, &target_path) {
                    Ok(data) => data,
                    Err(ArchiveError::Zip(ZipError::FileNotFound)) => {
                        tracing::debug!(link = %name, target = %target_path, "skipping broken symlink");
                        continue;
                    }
                    Err(ArchiveError::Zip(source)) => return Err(ArchiveError::Symlink { name, source }),
                    Err(err) => return Err(err),
                },
                None => {
                    tracing::debug!(link = %name, target = %target, "skipping symlink pointing outside the archive");
                    continue;
                }
            }
        } else {
            data
        };

        files.insert(name[prefix.len()..].to_string(), data);
    }

    Ok(Snapshot::new(source, prefix, files))
}

/// Replace a leading `*/` with the archive's top-level directory name.
fn expand_wildcard<R: Read + Seek>(archive: &ZipArchive<R>, dir: &str) -> String {
    let Some(suffix) = dir.strip_prefix(WILDCARD_DIR) else {
        return dir.to_string();
    };
    let Some(first) = archive.name_for_index(0) else {
        return dir.to_string();
    };

    let top = first.split('/').next().unwrap_or_default();
    format!("{top}/{suffix}")
}

fn read_entry<R: Read>(entry: &mut R, name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .map_err(|source| ArchiveError::Read { name: name.to_string(), source })?;
    Ok(data)
}

fn read_by_name<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut entry = archive.by_name(name)?;
    read_entry(&mut entry, name)
}

/// Resolve a symlink target relative to the link's own directory.
///
/// Returns `None` when the target climbs above the archive root.
fn resolve_link(link: &str, target: &str) -> Option<String> {
    let mut parts: Vec<&str> = link.split('/').collect();
    parts.pop();

    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }
    Some(parts.join("/"))
}
