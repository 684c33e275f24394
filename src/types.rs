//! Core data types used throughout the Deslusher library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Inputs**: `Snapshot`, `ActivityLog`, `RenameEvent` - the frozen documents one run consumes
//! - **Configuration**: `EventOrder`, `DeslushConfig` - how rename events are interpreted
//! - **Results**: `DriveReport`, `DeslushReport`, `MirrorReport` - per-drive records and aggregates
//!
//! Inputs use ordered maps so that every derived structure, and therefore every
//! report, is deterministic for identical documents.
//!
//! ## Examples
//!
//! ```rust
//! use deslusher::types::Snapshot;
//!
//! let mut snapshot = Snapshot::new();
//! snapshot.insert("/A", "x.txt", "id1");
//! snapshot.insert("/B", "y.txt", "id2");
//!
//! assert_eq!(snapshot.file_count(), 2);
//! assert_eq!(Snapshot::join("/A", "x.txt"), "/A/x.txt");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Content-store key of a file, stable across renames and moves
pub type ObjectId = String;

/// Point-in-time directory snapshot of one drive
///
/// Maps a slash-separated, rooted directory path to the files it holds,
/// keyed by current filename. Serialized exactly as the files document:
/// `{ "<dir>": { "<filename>": "<object id>" } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    directories: BTreeMap<String, BTreeMap<String, ObjectId>>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `filename` with content `id` inside `directory`
    ///
    /// Filenames are unique within a directory; inserting an existing name
    /// replaces its object id.
    pub fn insert(
        &mut self,
        directory: impl Into<String>,
        filename: impl Into<String>,
        id: impl Into<ObjectId>,
    ) {
        self.directories
            .entry(directory.into())
            .or_default()
            .insert(filename.into(), id.into());
    }

    /// Record a directory that holds no files
    pub fn insert_directory(&mut self, directory: impl Into<String>) {
        self.directories.entry(directory.into()).or_default();
    }

    /// Iterate over all directory paths
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.directories.keys().map(String::as_str)
    }

    /// Iterate over every `(directory, filename, object id)` triple
    pub fn files(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.directories.iter().flat_map(|(dir, files)| {
            files
                .iter()
                .map(move |(name, id)| (dir.as_str(), name.as_str(), id.as_str()))
        })
    }

    /// Look up the object id of `filename` in `directory`
    pub fn get(&self, directory: &str, filename: &str) -> Option<&str> {
        self.directories
            .get(directory)
            .and_then(|files| files.get(filename))
            .map(String::as_str)
    }

    /// Total number of files across all directories
    pub fn file_count(&self) -> usize {
        self.directories.values().map(BTreeMap::len).sum()
    }

    /// Number of directories
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// Check whether the snapshot holds no directories at all
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    /// Build the full file path `directory/filename`
    pub fn join(directory: &str, filename: &str) -> String {
        format!("{}/{}", directory.trim_end_matches('/'), filename)
    }
}

/// A single rename recorded by the activity log
///
/// At `timestamp` the file was renamed away from `prior_name` to the name it
/// carries in the snapshot (or to an intermediate name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEvent {
    /// When the rename was recorded
    #[serde(rename = "datetime", alias = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Name the file held immediately before the rename
    #[serde(rename = "filename")]
    pub prior_name: String,
}

impl RenameEvent {
    /// Create a rename event
    pub fn new(timestamp: DateTime<Utc>, prior_name: impl Into<String>) -> Self {
        Self {
            timestamp,
            prior_name: prior_name.into(),
        }
    }
}

/// Rename history of one drive, keyed by full file path at snapshot time
///
/// Event sequences keep the order the source log reports them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: BTreeMap<String, Vec<RenameEvent>>,
}

impl ActivityLog {
    /// Create an empty activity log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the sequence of `path`
    pub fn push(&mut self, path: impl Into<String>, event: RenameEvent) {
        self.entries.entry(path.into()).or_default().push(event);
    }

    /// Events recorded for `path`; a path without a log has no events
    pub fn events(&self, path: &str) -> &[RenameEvent] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over `(path, events)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RenameEvent])> {
        self.entries
            .iter()
            .map(|(path, events)| (path.as_str(), events.as_slice()))
    }

    /// Number of paths with a recorded sequence (possibly empty)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether no path has a recorded sequence
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a path's rename events are ordered before the last qualifying one wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrder {
    /// Keep the order of the activities document
    #[default]
    Recorded,
    /// Stable-sort by timestamp first, so the chronologically latest wins
    Chronological,
}

/// Effective settings of a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeslushConfig {
    /// Working directory holding documents, content store and output trees
    pub workspace: PathBuf,
    /// Earliest rename time considered
    pub cutoff: DateTime<Utc>,
    /// Event ordering applied by the slush resolver
    pub event_order: EventOrder,
    /// Restrict runs to a single drive
    pub drive_filter: Option<String>,
    /// Crate version that produced the run
    pub version: String,
}

/// A candidate directory left for manual review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondensedDirectory {
    /// Drive path of the candidate directory (e.g. `/A/x.txt`)
    pub path: String,
    /// Number of competing candidate links inside it
    pub candidates: usize,
}

/// A renamed file whose original name matches no current file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedRename {
    /// Current path of the file
    pub path: String,
    /// Resolved original name that exists nowhere in the snapshot
    pub original_name: String,
}

/// Result of reconciling one drive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveReport {
    /// Drive display name
    pub drive: String,
    /// Files in the snapshot
    pub files_analyzed: usize,
    /// Files with at least one qualifying rename event
    pub files_renamed: usize,
    /// Candidate directories collapsed into a single restored link
    pub files_restored: usize,
    /// Candidate directories left with more than one link
    pub condensed: Vec<CondensedDirectory>,
    /// Renamed files that produced no candidate
    pub unresolved: Vec<UnresolvedRename>,
    /// Root of the restored tree on disk
    pub restored_root: PathBuf,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

impl DriveReport {
    /// Number of directories awaiting manual disambiguation
    pub fn condensed_directories(&self) -> usize {
        self.condensed.len()
    }

    /// Total candidate links across all condensed directories
    pub fn total_candidates(&self) -> usize {
        self.condensed.iter().map(|c| c.candidates).sum()
    }

    /// Check whether every location was restored unambiguously
    pub fn is_fully_restored(&self) -> bool {
        self.condensed.is_empty() && self.unresolved.is_empty()
    }
}

/// Aggregate result over all processed drives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeslushReport {
    /// Per-drive records in drive-name order
    pub drives: Vec<DriveReport>,
}

impl DeslushReport {
    /// Files analyzed across all drives
    pub fn files_analyzed(&self) -> usize {
        self.drives.iter().map(|d| d.files_analyzed).sum()
    }

    /// Files restored across all drives
    pub fn files_restored(&self) -> usize {
        self.drives.iter().map(|d| d.files_restored).sum()
    }

    /// Condensed directories across all drives
    pub fn condensed_directories(&self) -> usize {
        self.drives.iter().map(DriveReport::condensed_directories).sum()
    }

    /// Candidate links across all drives
    pub fn total_candidates(&self) -> usize {
        self.drives.iter().map(DriveReport::total_candidates).sum()
    }

    /// Unresolved renames across all drives
    pub fn unresolved(&self) -> usize {
        self.drives.iter().map(|d| d.unresolved.len()).sum()
    }
}

/// Result of rebuilding the current-layout mirror of one drive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorReport {
    /// Drive display name
    pub drive: String,
    /// Directories created
    pub directories: usize,
    /// Links created
    pub links: usize,
    /// Root of the mirror tree on disk
    pub mirror_root: PathBuf,
}
