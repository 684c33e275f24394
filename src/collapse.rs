//! Collapse pass
//!
//! Classifies every processed candidate directory by the number of links it
//! holds and turns each unambiguous one into a single link carrying the
//! directory's own name.
//!
//! ## Classification
//!
//! | Links | Outcome |
//! |---|---|
//! | 1 | *single*: collapsed into the link |
//! | >1 | *condensed*: left untouched for manual review |
//! | 0 | ignored, not counted |
//!
//! ## Rename sequence
//!
//! A single-candidate directory `path` holding `entry` is replaced in three
//! steps, so `path` is never missing and never doubled:
//!
//! 1. rename `path` to the sibling `path.deslushed_<token>`
//! 2. rename `path.deslushed_<token>/entry` to `path`
//! 3. remove the now empty `path.deslushed_<token>`
//!
//! `<token>` is a random UUID, distinct per directory and per run.
//!
//! The whole plan is computed before the first rename: a directory's link
//! count is only final once materialization has finished.

use crate::error::{DeslushError, Result};
use crate::materialize::CandidateTree;
use crate::types::CondensedDirectory;
use crate::utils;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};
use uuid::Uuid;
use walkdir::WalkDir;

/// A candidate directory holding exactly one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleCandidate {
    /// Drive path of the directory
    pub path: String,
    /// Directory on disk
    pub directory: PathBuf,
    /// Name of the sole link inside it
    pub entry: OsString,
}

/// Classification of all processed candidate directories
#[derive(Debug, Clone, Default)]
pub struct CollapsePlan {
    /// Directories to collapse
    pub singles: Vec<SingleCandidate>,
    /// Directories left for manual review
    pub condensed: Vec<CondensedDirectory>,
}

impl CollapsePlan {
    /// Walk `tree` and classify every directory named in `processed`
    pub fn build(tree: &CandidateTree, processed: &BTreeSet<String>) -> Result<Self> {
        let mut wanted: BTreeMap<PathBuf, &str> = BTreeMap::new();
        for path in processed {
            wanted
                .entry(utils::drive_path_to_relative(path)?)
                .or_insert(path.as_str());
        }

        let mut plan = CollapsePlan::default();
        for entry in WalkDir::new(tree.root())
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(tree.root())
                .map_err(|_| DeslushError::internal(format!("{:?} escaped the tree root", entry.path())))?;
            let Some(drive_path) = wanted.get(relative) else {
                continue;
            };

            let links = symlink_entries(entry.path())?;
            match links.len() {
                0 => trace!("Ignoring empty candidate directory {}", drive_path),
                1 => {
                    debug!("Single candidate at {}", drive_path);
                    plan.singles.push(SingleCandidate {
                        path: drive_path.to_string(),
                        directory: entry.path().to_path_buf(),
                        entry: links.into_iter().next().unwrap_or_default(),
                    });
                }
                n => {
                    debug!("Condensed directory {} with {} candidates", drive_path, n);
                    plan.condensed.push(CondensedDirectory {
                        path: drive_path.to_string(),
                        candidates: n,
                    });
                }
            }
        }
        Ok(plan)
    }

    /// Total candidate links across condensed directories
    pub fn total_candidates(&self) -> usize {
        self.condensed.iter().map(|c| c.candidates).sum()
    }

    /// Collapse every single-candidate directory, deepest first
    ///
    /// Returns the drive paths restored. Stops at the first failure; the tree
    /// may then hold a `.deslushed_<token>` sibling.
    pub fn apply(&self) -> Result<Vec<String>> {
        let mut singles: Vec<&SingleCandidate> = self.singles.iter().collect();
        singles.sort_by(|a, b| {
            b.directory
                .components()
                .count()
                .cmp(&a.directory.components().count())
                .then_with(|| a.directory.cmp(&b.directory))
        });

        let mut restored = Vec::with_capacity(singles.len());
        for single in singles {
            collapse_directory(&single.directory, &single.entry)?;
            restored.push(single.path.clone());
        }
        info!("Collapsed {} single-candidate directories", restored.len());
        Ok(restored)
    }
}

/// Names of the symlinks directly inside `dir`, sorted
fn symlink_entries(dir: &Path) -> Result<Vec<OsString>> {
    let mut links = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_symlink() {
            links.push(entry.file_name());
        }
    }
    links.sort();
    Ok(links)
}

/// Sibling of `path` used while collapsing it
pub fn temporary_sibling(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| DeslushError::internal(format!("{:?} has no file name", path)))?;
    let mut temp_name = name.to_os_string();
    temp_name.push(format!(".deslushed_{}", Uuid::new_v4().simple()));
    Ok(path.with_file_name(temp_name))
}

/// Replace the directory `path` by its sole link `entry`
pub fn collapse_directory(path: &Path, entry: &std::ffi::OsStr) -> Result<()> {
    let temp = temporary_sibling(path)?;
    trace!("Collapsing {:?} via {:?}", path, temp);

    fs::rename(path, &temp).map_err(|source| DeslushError::CollapseFailed {
        path: path.to_path_buf(),
        step: "move directory aside",
        source,
    })?;
    fs::rename(temp.join(entry), path).map_err(|source| DeslushError::CollapseFailed {
        path: path.to_path_buf(),
        step: "move link into place",
        source,
    })?;
    fs::remove_dir(&temp).map_err(|source| DeslushError::CollapseFailed {
        path: path.to_path_buf(),
        step: "remove temporary directory",
        source,
    })?;
    Ok(())
}
