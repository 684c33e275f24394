//! Filename index
//!
//! Maps a bare filename to every snapshot directory currently holding a file
//! with that name. The materializer uses it to guess where a renamed file used
//! to live: wherever its original name still exists today.

use crate::types::Snapshot;
use std::collections::BTreeMap;
use tracing::debug;

/// Bare filename to containing directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameIndex {
    directories: BTreeMap<String, Vec<String>>,
}

impl FilenameIndex {
    /// Build the index from a full snapshot
    ///
    /// Directories are appended in snapshot iteration order. A directory
    /// appears at most once per filename since names are unique within a
    /// directory.
    pub fn build(snapshot: &Snapshot) -> Self {
        let mut directories: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (directory, filename, _) in snapshot.files() {
            directories
                .entry(filename.to_string())
                .or_default()
                .push(directory.to_string());
        }
        debug!("Indexed {} distinct filenames", directories.len());
        Self { directories }
    }

    /// Directories containing a file named `filename`; empty if none does
    pub fn directories_of(&self, filename: &str) -> &[String] {
        self.directories
            .get(filename)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct filenames
    pub fn len(&self) -> usize {
        self.directories.len()
    }

    /// Check whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}
