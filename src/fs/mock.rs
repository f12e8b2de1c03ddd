// src/fs/mock.rs

//! In-memory [`PathOracle`] with fully controlled timestamps.
//!
//! Timestamps are expressed as whole seconds after the epoch (see [`stamp`]),
//! so tests can state "A is newer than B" without sleeping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use super::{PathKind, PathOracle};

/// `SystemTime` at `secs` seconds past the epoch.
pub fn stamp(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[derive(Debug, Clone)]
enum MockEntry {
    File { mtime: SystemTime },
    Dir,
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file with the given timestamp; parent directories appear
    /// implicitly. Re-registering an existing file updates its timestamp.
    pub fn add_file(&self, path: impl AsRef<Path>, mtime_secs: u64) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap();
        let mut parent = path.parent().map(Path::to_path_buf);
        entries.insert(
            path,
            MockEntry::File {
                mtime: stamp(mtime_secs),
            },
        );
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            parent = dir.parent().map(Path::to_path_buf);
            entries.entry(dir).or_insert(MockEntry::Dir);
        }
    }

    /// Alias for [`MockOracle::add_file`], reading better in "touch A at t"
    /// test narratives.
    pub fn touch(&self, path: impl AsRef<Path>, mtime_secs: u64) {
        self.add_file(path, mtime_secs);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), MockEntry::Dir);
    }

    /// Register an unclassifiable entry (stands in for a broken symlink).
    pub fn add_unknown(&self, path: impl AsRef<Path>) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), MockEntry::Unknown);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.entries.lock().unwrap().remove(path.as_ref());
    }
}

impl PathOracle for MockOracle {
    fn classify(&self, path: &Path) -> PathKind {
        match self.entries.lock().unwrap().get(path) {
            Some(MockEntry::File { .. }) => PathKind::File,
            Some(MockEntry::Dir) => PathKind::Directory,
            Some(MockEntry::Unknown) => PathKind::Unknown,
            None => PathKind::Missing,
        }
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path)? {
            MockEntry::File { mtime } => Some(*mtime),
            MockEntry::Unknown => None,
            MockEntry::Dir => {
                // Newest file strictly beneath this directory; empty
                // directories are present at the epoch, like the real walk.
                let newest = entries
                    .iter()
                    .filter(|(p, _)| p.starts_with(path) && *p != path)
                    .filter_map(|(_, entry)| match entry {
                        MockEntry::File { mtime } => Some(*mtime),
                        _ => None,
                    })
                    .max();
                Some(newest.unwrap_or(SystemTime::UNIX_EPOCH))
            }
        }
    }
}
