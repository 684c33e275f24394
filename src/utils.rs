//! Utility functions for Deslusher
//!
//! ## Categories of Utilities
//!
//! ### Drive Paths
//! - Mapping slash-separated drive paths onto a tree root
//! - Filename extension splitting and candidate link naming
//!
//! ### File Operations
//! - Symbolic link creation and reading (cross-platform)
//! - Whole-tree removal
//!
//! ### Time
//! - Parsing ISO 8601 cutoff timestamps
//!
//! All functions return `Result<T, DeslushError>` where they can fail.

use crate::error::{DeslushError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Map a rooted drive path such as `/A/B/x.txt` onto a path relative to a
/// tree root
///
/// Leading and repeated slashes are tolerated. `.`/`..` components and
/// anything that would escape the tree root are rejected.
///
/// # Errors
///
/// - [`DeslushError::InvalidPath`] if a component is `.` or `..`, or the
///   path parses as something other than plain names
pub fn drive_path_to_relative(drive_path: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for part in drive_path.split('/').filter(|p| !p.is_empty()) {
        if part == "." || part == ".." {
            return Err(DeslushError::invalid_path(drive_path));
        }
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => relative.push(part),
            _ => return Err(DeslushError::invalid_path(drive_path)),
        }
    }
    Ok(relative)
}

/// Resolve a drive path below `root`
pub fn resolve_under(root: &Path, drive_path: &str) -> Result<PathBuf> {
    Ok(root.join(drive_path_to_relative(drive_path)?))
}

/// Validate a bare filename taken from a document
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty() || filename.contains('/') || filename == "." || filename == ".." {
        return Err(DeslushError::invalid_path(filename));
    }
    Ok(())
}

/// Split a filename on its last `.` and return the extension
///
/// `report.final.docx` yields `docx`; `.bashrc` yields `bashrc`; a name
/// without a dot has no extension.
pub fn split_extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

/// Name of the link created for object `id` under a candidate directory
/// whose name is `filename`
pub fn candidate_link_name(id: &str, filename: &str) -> String {
    match split_extension(filename) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Parse a cutoff timestamp
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`, `2024-01-01T02:00:00+02:00`) or a
/// bare `yyyy-mm-ddThh:mm:ss`, which is taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DeslushError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;
    symlink(target, link)?;
    Ok(())
}

/// Create a symlink (Windows)
///
/// Content-store objects are always files.
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::symlink_file;
    symlink_file(target, link)?;
    Ok(())
}

/// Read symlink target
pub fn read_symlink(path: &Path) -> Result<PathBuf> {
    Ok(fs::read_link(path)?)
}

/// Check whether `path` is a symlink without following it
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Remove a tree produced by an earlier run, if present
pub fn remove_tree(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path)?;
            trace!("Removed previous tree: {:?}", path);
            Ok(true)
        }
        Ok(_) => {
            fs::remove_file(path)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
