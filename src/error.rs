//! Error types for the Deslusher library
//!
//! This module defines all error types that can occur while loading the input
//! documents, materializing candidate trees and collapsing them. Every error
//! is fatal for the drive being processed: a run is never resumed, the caller
//! re-runs after fixing the cause.
//!
//! Ambiguous restorations and renames whose original name matches nothing
//! are *not* errors. They are reported through
//! [`DriveReport`](crate::types::DriveReport).

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the Deslusher library
pub type Result<T> = std::result::Result<T, DeslushError>;

/// Main error type for all Deslusher operations
#[derive(Debug, Error)]
pub enum DeslushError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A required input document does not exist
    #[error("Missing {kind} document: {path:?}")]
    MissingDocument {
        /// Which document was expected
        kind: DocumentKind,
        /// Where it was expected
        path: PathBuf,
    },

    /// An input document exists but cannot be parsed
    #[error("Malformed {kind} document {path:?}: {reason}")]
    MalformedDocument {
        /// Which document failed to parse
        kind: DocumentKind,
        /// Path of the document
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A directory path or filename from a document cannot be mapped onto disk
    #[error("Invalid path in document: {0:?}")]
    InvalidPath(String),

    /// A timestamp could not be parsed
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// The offending input
        value: String,
        /// Parser message
        reason: String,
    },

    /// The requested drive is not listed in the drives document
    #[error("Drive not found: {0}")]
    DriveNotFound(String),

    /// A candidate link already exists with a different target
    #[error("Link conflict at {link:?}: already points to {existing:?}, wanted {wanted:?}")]
    LinkConflict {
        /// Link path inside the candidate tree
        link: PathBuf,
        /// Target found on disk
        existing: PathBuf,
        /// Target the materializer tried to create
        wanted: PathBuf,
    },

    /// One of the three collapse renames failed
    #[error("Collapse of {path:?} failed during {step}: {source}")]
    CollapseFailed {
        /// Candidate directory being collapsed
        path: PathBuf,
        /// Which step of the rename sequence failed
        step: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An output tree failed verification
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The three input documents of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Drive name to drive id mapping
    Drives,
    /// Directory/file snapshot of one drive
    Files,
    /// Rename activity log of one drive
    Activities,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Drives => write!(f, "drives"),
            DocumentKind::Files => write!(f, "files"),
            DocumentKind::Activities => write!(f, "activities"),
        }
    }
}

impl DeslushError {
    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        DeslushError::Internal(msg.into())
    }

    /// Create an invalid-path error for a document path or filename
    pub fn invalid_path(path: impl Into<String>) -> Self {
        DeslushError::InvalidPath(path.into())
    }

    /// Check if this error is caused by the input documents rather than the
    /// filesystem the trees are written to
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DeslushError::MissingDocument { .. }
                | DeslushError::MalformedDocument { .. }
                | DeslushError::InvalidPath(_)
                | DeslushError::InvalidTimestamp { .. }
                | DeslushError::DriveNotFound(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            DeslushError::MissingDocument { kind, path } => {
                format!(
                    "The {} document {:?} does not exist. Run the download commands first or point --directory at the right workspace.",
                    kind, path
                )
            }
            DeslushError::DriveNotFound(name) => {
                format!("Drive '{}' is not listed in the drives document. Use 'deslusher drives' to see known drives.", name)
            }
            DeslushError::InvalidTimestamp { value, .. } => {
                format!("Cannot parse '{}'. Use ISO 8601, e.g. 2024-01-01T00:00:00Z.", value)
            }
            DeslushError::CollapseFailed { path, .. } => {
                format!(
                    "{} The restored tree is left partially collapsed; remove {:?} and re-run.",
                    self, path.parent().unwrap_or(path)
                )
            }
            _ => self.to_string(),
        }
    }
}
