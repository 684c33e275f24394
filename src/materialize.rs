//! Candidate tree materialization
//!
//! Builds the on-disk staging tree the collapse pass works on. Every snapshot
//! file contributes links into one or more *candidate directories*:
//!
//! - an unrenamed file at `D/F` gets a directory `D/F` holding one link
//!   `<id>.<ext of F>`;
//! - a renamed file whose original name resolved to `O` gets a link
//!   `<id>.<ext of O>` inside `G/O` for every directory `G` that currently
//!   holds a file named `O`.
//!
//! Several files may land in the same candidate directory. That ambiguity is
//! intentional and is what the collapse pass detects.
//!
//! The module also builds the *mirror* tree: the current layout, one link per
//! file under its current name, with no reconciliation applied.

use crate::error::{DeslushError, Result};
use crate::index::FilenameIndex;
use crate::slush::SlushMap;
use crate::types::{Snapshot, UnresolvedRename};
use crate::utils;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Outcome of populating a candidate tree
#[derive(Debug, Clone, Default)]
pub struct Materialization {
    /// Drive paths of candidate directories eligible for collapse
    pub processed: BTreeSet<String>,
    /// Renamed files whose original name exists nowhere in the snapshot
    pub unresolved: Vec<UnresolvedRename>,
    /// Snapshot files with a resolved original name
    pub renamed: usize,
    /// Links written into the tree
    pub links_created: usize,
}

/// Staging tree rooted at a drive's restored-tree location
#[derive(Debug, Clone)]
pub struct CandidateTree {
    root: PathBuf,
    objects_dir: PathBuf,
}

impl CandidateTree {
    /// Create an empty candidate tree at `root`, removing the output of any
    /// previous run first
    ///
    /// Links will target `objects_dir/<id>`; `objects_dir` should be absolute.
    pub fn create(root: PathBuf, objects_dir: PathBuf) -> Result<Self> {
        if utils::remove_tree(&root)? {
            info!("Removed previous tree at {:?}", root);
        }
        fs::create_dir_all(&root)?;
        Ok(Self { root, objects_dir })
    }

    /// Root of the tree on disk
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of a drive path inside the tree
    pub fn path_of(&self, drive_path: &str) -> Result<PathBuf> {
        utils::resolve_under(&self.root, drive_path)
    }

    /// Populate the tree from a snapshot and its resolved renames
    ///
    /// Every snapshot directory is created first so that the restored tree
    /// keeps the current folder structure, including empty folders.
    pub fn materialize(
        &self,
        snapshot: &Snapshot,
        slush: &SlushMap,
        index: &FilenameIndex,
    ) -> Result<Materialization> {
        let mut result = Materialization::default();

        for directory in snapshot.directories() {
            fs::create_dir_all(self.path_of(directory)?)?;
        }

        for (directory, filename, id) in snapshot.files() {
            let path = Snapshot::join(directory, filename);
            match slush.original_name(&path) {
                None => {
                    if self.add_candidate(&path, id, filename)? {
                        result.links_created += 1;
                    }
                    result.processed.insert(path);
                }
                Some(original) => {
                    result.renamed += 1;
                    let origins = index.directories_of(original);
                    if origins.is_empty() {
                        warn!("No current file is named {:?}; {} has no candidate", original, path);
                        result.unresolved.push(UnresolvedRename {
                            path,
                            original_name: original.to_string(),
                        });
                        continue;
                    }
                    utils::validate_filename(original)?;
                    for origin in origins {
                        let candidate = Snapshot::join(origin, original);
                        debug!("Candidate for {}: {}", path, candidate);
                        if self.add_candidate(&candidate, id, original)? {
                            result.links_created += 1;
                        }
                        result.processed.insert(candidate);
                    }
                }
            }
        }

        info!(
            "Materialized {} links into {} candidate directories ({} unresolved)",
            result.links_created,
            result.processed.len(),
            result.unresolved.len()
        );
        Ok(result)
    }

    /// Link object `id` into the candidate directory `candidate`, naming the
    /// link after the extension of `name`
    ///
    /// Returns `false` when an identical link is already present.
    fn add_candidate(&self, candidate: &str, id: &str, name: &str) -> Result<bool> {
        let directory = self.path_of(candidate)?;
        fs::create_dir_all(&directory)?;
        let link = directory.join(utils::candidate_link_name(id, name));
        let target = self.objects_dir.join(id);
        link_object(&link, &target)
    }
}

/// Create `link -> target`, tolerating an identical existing link
fn link_object(link: &Path, target: &Path) -> Result<bool> {
    if utils::is_symlink(link) {
        let existing = utils::read_symlink(link)?;
        if existing == target {
            trace!("Link {:?} already present", link);
            return Ok(false);
        }
        return Err(DeslushError::LinkConflict {
            link: link.to_path_buf(),
            existing,
            wanted: target.to_path_buf(),
        });
    }
    trace!("Creating symlink {:?} -> {:?}", link, target);
    utils::create_symlink(target, link)?;
    Ok(true)
}

/// Rebuild the current-layout mirror of a snapshot at `root`
///
/// Each file becomes a link under its current name. Returns the number of
/// directories and links created.
pub fn build_mirror(snapshot: &Snapshot, root: &Path, objects_dir: &Path) -> Result<(usize, usize)> {
    if utils::remove_tree(root)? {
        info!("Removed previous mirror at {:?}", root);
    }
    fs::create_dir_all(root)?;

    let mut directories = 0;
    let mut links = 0;
    for directory in snapshot.directories() {
        fs::create_dir_all(utils::resolve_under(root, directory)?)?;
        directories += 1;
    }
    for (directory, filename, id) in snapshot.files() {
        let link = utils::resolve_under(root, &Snapshot::join(directory, filename))?;
        if link_object(&link, &objects_dir.join(id))? {
            links += 1;
        }
    }
    debug!("Mirror at {:?}: {} directories, {} links", root, directories, links);
    Ok((directories, links))
}
