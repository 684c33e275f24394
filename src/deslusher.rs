//! Main Deslusher implementation
//!
//! This module provides the [`Deslusher`] struct, the entry point for
//! reconciling drives, rebuilding mirrors and verifying output trees. It
//! coordinates the engine's stages for one drive at a time:
//!
//! 1. **Slush resolution**: activity log + cutoff → resolved original names
//! 2. **Filename index**: snapshot → directories per filename
//! 3. **Candidate materialization**: links into candidate directories
//! 4. **Collapse**: single-candidate directories become restored links
//!
//! Stages run strictly in this order and synchronously. Each drive produces
//! its own [`DriveReport`]; nothing is carried from one drive to the next.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use deslusher::{DeslusherBuilder, utils::parse_timestamp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let deslusher = DeslusherBuilder::new()
//!     .cutoff(parse_timestamp("2024-01-01T00:00:00Z")?)
//!     .build("./data")?;
//!
//! let report = deslusher.deslush()?;
//! println!("Restored {} files", report.files_restored());
//! # Ok(())
//! # }
//! ```

use crate::collapse::CollapsePlan;
use crate::error::{DeslushError, Result};
use crate::index::FilenameIndex;
use crate::materialize::{self, CandidateTree};
use crate::slush::SlushResolver;
use crate::types::*;
use crate::verification::{TreeVerifier, VerificationReport};
use crate::workspace::{Drive, Workspace};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Reconciliation engine bound to one workspace
///
/// Assumes exclusive access to the workspace's output trees for the duration
/// of a call. Create it with [`DeslusherBuilder`].
#[derive(Debug, Clone)]
pub struct Deslusher {
    workspace: Workspace,
    resolver: SlushResolver,
    config: DeslushConfig,
}

impl Deslusher {
    /// Workspace this engine reads from and writes to
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Effective configuration
    pub fn config(&self) -> &DeslushConfig {
        &self.config
    }

    /// Drives selected by the drive filter, in drive-name order
    ///
    /// # Errors
    ///
    /// - [`DeslushError::MissingDocument`] if the drives document is absent
    /// - [`DeslushError::DriveNotFound`] if the filter names an unknown drive
    pub fn drives(&self) -> Result<Vec<Drive>> {
        let drives = self.workspace.load_drives()?;
        match &self.config.drive_filter {
            None => Ok(drives),
            Some(name) => {
                let selected: Vec<Drive> = drives.into_iter().filter(|d| &d.name == name).collect();
                if selected.is_empty() {
                    return Err(DeslushError::DriveNotFound(name.clone()));
                }
                Ok(selected)
            }
        }
    }

    /// Reconcile every selected drive
    ///
    /// Fails fast: the first failing drive aborts the run, drives already
    /// processed keep their restored trees.
    pub fn deslush(&self) -> Result<DeslushReport> {
        let mut report = DeslushReport::default();
        for drive in self.drives()? {
            report.drives.push(self.deslush_drive(&drive.name)?);
        }
        Ok(report)
    }

    /// Reconcile one drive and rebuild its restored tree
    ///
    /// Both of the drive's documents are loaded before anything is written, so
    /// a missing document leaves the previous restored tree untouched.
    #[instrument(skip(self))]
    pub fn deslush_drive(&self, drive: &str) -> Result<DriveReport> {
        info!("Deslushing drive '{}'", drive);
        let start = Instant::now();

        let snapshot = self.workspace.load_snapshot(drive)?;
        let log = self.workspace.load_activity_log(drive)?;

        let slush = self.resolver.resolve(&log);
        let index = FilenameIndex::build(&snapshot);

        let tree = CandidateTree::create(
            self.workspace.deslushed_tree(drive),
            self.workspace.objects_dir(),
        )?;
        let materialization = tree.materialize(&snapshot, &slush, &index)?;

        let plan = CollapsePlan::build(&tree, &materialization.processed)?;
        let restored = plan.apply()?;

        for unresolved in &materialization.unresolved {
            warn!(
                "Unresolved rename: {} was named {:?}, which matches no current file",
                unresolved.path, unresolved.original_name
            );
        }

        let report = DriveReport {
            drive: drive.to_string(),
            files_analyzed: snapshot.file_count(),
            files_renamed: materialization.renamed,
            files_restored: restored.len(),
            condensed: plan.condensed,
            unresolved: materialization.unresolved,
            restored_root: tree.root().to_path_buf(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Drive '{}': analyzed {} files, restored {}, {} condensed directories ({} candidates), {} unresolved in {}ms",
            drive,
            report.files_analyzed,
            report.files_restored,
            report.condensed_directories(),
            report.total_candidates(),
            report.unresolved.len(),
            report.duration_ms
        );
        Ok(report)
    }

    /// Rebuild the current-layout mirror of every selected drive
    pub fn mirror(&self) -> Result<Vec<MirrorReport>> {
        self.drives()?
            .iter()
            .map(|drive| self.mirror_drive(&drive.name))
            .collect()
    }

    /// Rebuild the current-layout mirror of one drive
    #[instrument(skip(self))]
    pub fn mirror_drive(&self, drive: &str) -> Result<MirrorReport> {
        info!("Mirroring drive '{}'", drive);
        let snapshot = self.workspace.load_snapshot(drive)?;
        let mirror_root = self.workspace.original_tree(drive);
        let (directories, links) =
            materialize::build_mirror(&snapshot, &mirror_root, &self.workspace.objects_dir())?;
        Ok(MirrorReport {
            drive: drive.to_string(),
            directories,
            links,
            mirror_root,
        })
    }

    /// Verify the restored tree of `drive`
    pub fn verify_restored(&self, drive: &str) -> Result<VerificationReport> {
        self.verify_tree(self.workspace.deslushed_tree(drive))
    }

    /// Verify the mirror tree of `drive`
    pub fn verify_mirror(&self, drive: &str) -> Result<VerificationReport> {
        self.verify_tree(self.workspace.original_tree(drive))
    }

    fn verify_tree(&self, root: PathBuf) -> Result<VerificationReport> {
        TreeVerifier::new(self.workspace.objects_dir()).verify(&root)
    }
}

/// Builder pattern for Deslusher configuration
///
/// # Examples
///
/// ```rust,no_run
/// use deslusher::{DeslusherBuilder, EventOrder};
/// use deslusher::utils::parse_timestamp;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let deslusher = DeslusherBuilder::new()
///     .cutoff(parse_timestamp("2024-01-01T00:00:00Z")?)
///     .event_order(EventOrder::Chronological)
///     .drive_filter(Some("Documents".to_string()))
///     .build("./data")?;
/// # Ok(())
/// # }
/// ```
///
/// # Default Values
///
/// - `cutoff`: none; required for reconciliation
/// - `event_order`: `EventOrder::Recorded`
/// - `drive_filter`: none (all drives)
#[derive(Debug, Clone, Default)]
pub struct DeslusherBuilder {
    cutoff: Option<DateTime<Utc>>,
    event_order: EventOrder,
    drive_filter: Option<String>,
}

impl DeslusherBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the earliest rename time considered
    pub fn cutoff(mut self, cutoff: DateTime<Utc>) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Set how rename events are ordered before the last qualifying one wins
    pub fn event_order(mut self, order: EventOrder) -> Self {
        self.event_order = order;
        self
    }

    /// Restrict runs to one drive
    pub fn drive_filter(mut self, drive: Option<String>) -> Self {
        self.drive_filter = drive;
        self
    }

    /// Build a Deslusher for the workspace at `workspace`
    ///
    /// # Errors
    ///
    /// - [`DeslushError::InvalidConfiguration`] if no cutoff was set
    pub fn build(self, workspace: impl Into<PathBuf>) -> Result<Deslusher> {
        let cutoff = self.cutoff.ok_or_else(|| {
            DeslushError::InvalidConfiguration("a cutoff timestamp is required".to_string())
        })?;
        self.build_with_cutoff(workspace, cutoff)
    }

    /// Build a Deslusher for operations that never resolve renames
    ///
    /// Mirroring and verification ignore the cutoff; a cutoff set on the
    /// builder is still honored.
    pub fn build_for_inspection(self, workspace: impl Into<PathBuf>) -> Result<Deslusher> {
        let cutoff = self.cutoff.unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.build_with_cutoff(workspace, cutoff)
    }

    fn build_with_cutoff(self, workspace: impl Into<PathBuf>, cutoff: DateTime<Utc>) -> Result<Deslusher> {
        let workspace = Workspace::new(workspace)?;
        let config = DeslushConfig {
            workspace: workspace.root().to_path_buf(),
            cutoff,
            event_order: self.event_order,
            drive_filter: self.drive_filter,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        Ok(Deslusher {
            workspace,
            resolver: SlushResolver::new(cutoff, self.event_order),
            config,
        })
    }
}
