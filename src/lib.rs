//! # Deslusher - Restore the pre-rename layout of a file store
//!
//! Reconstructs how a remote file store was organized before a wave of
//! renames ("slush") by correlating a point-in-time directory snapshot with a
//! log of rename events, then re-materializes the inferred original layout as
//! a tree of symbolic links into a content-addressed object store.
//!
//! ## Overview
//!
//! A reconciliation run for one drive:
//! - resolves, per file, the name it held before the cutoff
//!   ([`slush::SlushResolver`]),
//! - guesses where each renamed file used to live, namely every directory that
//!   still holds a file with its original name ([`index::FilenameIndex`]),
//! - writes one candidate directory per guessed location
//!   ([`materialize::CandidateTree`]),
//! - collapses every candidate directory holding exactly one link into that
//!   link ([`collapse::CollapsePlan`]) and leaves ambiguous ones for manual
//!   review.
//!
//! The engine never talks to the remote service. Its inputs are the documents
//! of a [`Workspace`]: a drives list, one snapshot and one activity log per
//! drive, and the content store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deslusher::DeslusherBuilder;
//! use deslusher::utils::parse_timestamp;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let deslusher = DeslusherBuilder::new()
//!     .cutoff(parse_timestamp("2024-01-01T00:00:00Z")?)
//!     .build("./data")?;
//!
//! for drive in deslusher.deslush()?.drives {
//!     println!(
//!         "{}: restored {} files, {} directories need review",
//!         drive.drive,
//!         drive.files_restored,
//!         drive.condensed_directories()
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Runs are single-threaded and synchronous. A run assumes exclusive access to
//! the drive's output tree; two concurrent runs against the same workspace are
//! unsafe. An interrupted run may leave `*.deslushed_<token>` directories
//! behind; the next run removes the whole restored tree before rebuilding it.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, DeslushError>`. Missing or malformed
//! documents and filesystem failures are fatal for the drive being processed.
//! Ambiguous locations and renames whose original name matches nothing are
//! outcomes, reported through [`DriveReport`].
//!
//! ## Module Organization
//!
//! - [`workspace`]: Workspace layout and document loading
//! - [`slush`]: Rename resolution against a cutoff
//! - [`index`]: Filename to directories index
//! - [`materialize`]: Candidate tree and mirror tree construction
//! - [`collapse`]: Classification and the crash-safe collapse renames
//! - [`verification`]: Output tree checks
//! - [`types`]: Documents, configuration and reports
//! - [`error`]: Error types and handling

pub mod collapse;
pub mod deslusher;
pub mod error;
pub mod index;
pub mod materialize;
pub mod slush;
pub mod types;
pub mod utils;
pub mod verification;
pub mod workspace;

// Re-export main types for convenience
pub use deslusher::{Deslusher, DeslusherBuilder};
pub use error::{DeslushError, DocumentKind, Result};
pub use types::*;
pub use verification::{TreeVerifier, VerificationReport};
pub use workspace::{Drive, Workspace};
