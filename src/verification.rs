//! Output tree verification
//!
//! Checks that a materialized tree (restored or mirror) is made only of
//! directories and symbolic links, and that every link points at an existing
//! object inside the content store.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use deslusher::verification::TreeVerifier;
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = TreeVerifier::new(PathBuf::from("/data/objects"));
//! let report = verifier.verify(Path::new("/data/onedrive/Documents-deslushed"))?;
//! if !report.is_valid() {
//!     println!("{}", report.summary());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Verification failures are reported in the result, not as errors. Errors
//! mean the tree could not be walked at all.

use crate::error::Result;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Verifies trees against one content store
#[derive(Debug, Clone)]
pub struct TreeVerifier {
    objects_dir: PathBuf,
}

impl TreeVerifier {
    /// Create a verifier for links into `objects_dir`
    pub fn new(objects_dir: PathBuf) -> Self {
        Self { objects_dir }
    }

    /// Walk `root` and check every entry
    pub fn verify(&self, root: &Path) -> Result<VerificationReport> {
        let start = Instant::now();
        let mut report = VerificationReport {
            root: root.to_path_buf(),
            ..Default::default()
        };

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                report.directories += 1;
            } else if file_type.is_symlink() {
                report.links_checked += 1;
                let target = utils::read_symlink(entry.path())?;
                if !target.starts_with(&self.objects_dir) {
                    warn!("Link {:?} points outside the content store: {:?}", entry.path(), target);
                    report.outside_store.push(entry.path().to_path_buf());
                } else if !target.is_file() {
                    warn!("Dangling link {:?} -> {:?}", entry.path(), target);
                    report.dangling.push(entry.path().to_path_buf());
                }
            } else {
                report.regular_files.push(entry.path().to_path_buf());
            }
        }

        report.verification_time_ms = start.elapsed().as_millis() as u64;
        debug!("Verified {:?}: {}", root, report.summary());
        Ok(report)
    }
}

/// Result of verifying one tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Tree root
    pub root: PathBuf,
    /// Directories visited, including the root
    pub directories: usize,
    /// Symbolic links visited
    pub links_checked: usize,
    /// Links whose target object does not exist
    pub dangling: Vec<PathBuf>,
    /// Links pointing outside the content store
    pub outside_store: Vec<PathBuf>,
    /// Entries that are neither directories nor links
    pub regular_files: Vec<PathBuf>,
    /// Time taken in milliseconds
    pub verification_time_ms: u64,
}

impl VerificationReport {
    /// Check whether the tree passed every check
    pub fn is_valid(&self) -> bool {
        self.dangling.is_empty() && self.outside_store.is_empty() && self.regular_files.is_empty()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} links in {} directories: {} dangling, {} outside the content store, {} regular files",
            self.links_checked,
            self.directories,
            self.dangling.len(),
            self.outside_store.len(),
            self.regular_files.len()
        )
    }
}
