// src/fs/mod.rs

//! Filesystem oracle: path classification and effective modification time.
//!
//! The planner never touches `std::fs` directly; it talks to a [`PathOracle`]
//! so tests can substitute [`mock::MockOracle`] with fully controlled
//! timestamps.

use std::collections::HashSet;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub mod mock;

/// What a path resolves to on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at this path.
    Missing,
    File,
    Directory,
    /// Exists but is neither a regular file nor a directory; covers broken
    /// symlinks and special entries.
    Unknown,
}

/// Read-only filesystem queries used by the staleness planner.
pub trait PathOracle: Debug {
    fn classify(&self, path: &Path) -> PathKind;

    /// Effective modification time.
    ///
    /// - `None` for [`PathKind::Missing`] and [`PathKind::Unknown`].
    /// - The file mtime for [`PathKind::File`].
    /// - For [`PathKind::Directory`], the newest mtime over every regular
    ///   file transitively reachable beneath it. An empty directory yields
    ///   the epoch, so it still counts as "present".
    fn mtime(&self, path: &Path) -> Option<SystemTime>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOracle;

impl PathOracle for SystemOracle {
    fn classify(&self, path: &Path) -> PathKind {
        // metadata() follows symlinks; a broken symlink errors here but still
        // has symlink_metadata, which is how we tell Unknown from Missing.
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => PathKind::File,
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::Unknown,
            Err(_) => {
                if fs::symlink_metadata(path).is_ok() {
                    PathKind::Unknown
                } else {
                    PathKind::Missing
                }
            }
        }
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        match self.classify(path) {
            PathKind::Missing | PathKind::Unknown => None,
            PathKind::File => fs::metadata(path).ok()?.modified().ok(),
            PathKind::Directory => Some(directory_mtime(path)),
        }
    }
}

/// Newest mtime of every regular file under `root`.
///
/// Symlinked subdirectories are followed, but a real directory already
/// visited in this walk is not re-entered, which keeps symlink cycles from
/// looping. Entries whose name starts with `.` are skipped, as are broken
/// symlinks.
fn directory_mtime(root: &Path) -> SystemTime {
    let mut latest = SystemTime::UNIX_EPOCH;
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let real = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if !visited.insert(real) {
            continue;
        }

        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };

        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let entry_path = entry.path();
            match fs::metadata(&entry_path) {
                Ok(meta) if meta.is_dir() => stack.push(entry_path),
                Ok(meta) if meta.is_file() => {
                    if let Ok(mtime) = meta.modified() {
                        if mtime > latest {
                            latest = mtime;
                        }
                    }
                }
                // broken symlink or special entry
                _ => {}
            }
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn classify_file_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        File::create(&file).unwrap().write_all(b"x").unwrap();

        let oracle = SystemOracle;
        assert_eq!(oracle.classify(&file), PathKind::File);
        assert_eq!(oracle.classify(dir.path()), PathKind::Directory);
        assert_eq!(
            oracle.classify(&dir.path().join("nope")),
            PathKind::Missing
        );
    }

    #[test]
    fn missing_path_has_no_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = SystemOracle;
        assert_eq!(oracle.mtime(&dir.path().join("nope")), None);
    }

    #[test]
    fn directory_mtime_tracks_newest_file() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let old = dir.path().join("old.txt");
        File::create(&old).unwrap().write_all(b"old").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let new = sub.join("new.txt");
        File::create(&new).unwrap().write_all(b"new").unwrap();

        let oracle = SystemOracle;
        let file_mtime = oracle.mtime(&new).unwrap();
        assert_eq!(oracle.mtime(dir.path()), Some(file_mtime));
    }

    #[test]
    fn directory_mtime_skips_dot_entries() {
        let dir = tempfile::tempdir().unwrap();
        let visible = dir.path().join("a.txt");
        File::create(&visible).unwrap().write_all(b"a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        File::create(dir.path().join(".hidden"))
            .unwrap()
            .write_all(b"h")
            .unwrap();

        let oracle = SystemOracle;
        assert_eq!(oracle.mtime(dir.path()), oracle.mtime(&visible));
    }

    #[test]
    fn empty_directory_is_present_at_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = SystemOracle;
        assert_eq!(oracle.mtime(dir.path()), Some(SystemTime::UNIX_EPOCH));
    }
}
