//! Workspace layout and input document loading
//!
//! A workspace is the working directory shared by the acquisition commands
//! and the reconciliation engine. Its layout is fixed:
//!
//! ```text
//! workspace/
//! ├── onedrive-drives.json                 # drive name -> drive id
//! ├── onedrive-files_<drive>.json          # snapshot: dir -> filename -> object id
//! ├── onedrive-activities_<drive>.json     # path -> [{datetime, filename}]
//! ├── objects/                             # content store, one file per object id
//! │   └── <object id>
//! └── onedrive/
//!     ├── <drive>-original/                # mirror of the current layout
//!     └── <drive>-deslushed/               # restored tree
//! ```
//!
//! Documents are read-only inputs. A missing or unparsable document is fatal
//! and names the document in the error.

use crate::error::{DeslushError, DocumentKind, Result};
use crate::types::{ActivityLog, Snapshot};
use crate::utils;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DRIVES_DOCUMENT: &str = "onedrive-drives.json";
const OBJECTS_DIR: &str = "objects";
const TREES_DIR: &str = "onedrive";

/// A drive listed in the drives document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drive {
    /// Display name, used in document and tree names
    pub name: String,
    /// Remote drive identifier
    pub id: String,
}

/// Paths and loaders for one working directory
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace rooted at `root`
    ///
    /// The root is made absolute so that links written into the output trees
    /// point at absolute content-store paths.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = std::path::absolute(root.into())?;
        Ok(Self { root })
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the drives document
    pub fn drives_document(&self) -> PathBuf {
        self.root.join(DRIVES_DOCUMENT)
    }

    /// Location of the files document of `drive`
    pub fn files_document(&self, drive: &str) -> PathBuf {
        self.root.join(format!("onedrive-files_{}.json", drive))
    }

    /// Location of the activities document of `drive`
    pub fn activities_document(&self, drive: &str) -> PathBuf {
        self.root.join(format!("onedrive-activities_{}.json", drive))
    }

    /// Content-store directory
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    /// Content-store path of `id`
    pub fn object_path(&self, id: &str) -> Result<PathBuf> {
        utils::validate_filename(id)?;
        Ok(self.objects_dir().join(id))
    }

    /// Root of the current-layout mirror of `drive`
    pub fn original_tree(&self, drive: &str) -> PathBuf {
        self.root.join(TREES_DIR).join(format!("{}-original", drive))
    }

    /// Root of the restored tree of `drive`
    pub fn deslushed_tree(&self, drive: &str) -> PathBuf {
        self.root.join(TREES_DIR).join(format!("{}-deslushed", drive))
    }

    /// Load the drives document, in drive-name order
    pub fn load_drives(&self) -> Result<Vec<Drive>> {
        let drives: BTreeMap<String, String> =
            load_document(DocumentKind::Drives, &self.drives_document())?;
        for name in drives.keys() {
            utils::validate_filename(name)?;
        }
        Ok(drives
            .into_iter()
            .map(|(name, id)| Drive { name, id })
            .collect())
    }

    /// Load and validate the snapshot of `drive`
    pub fn load_snapshot(&self, drive: &str) -> Result<Snapshot> {
        let snapshot: Snapshot = load_document(DocumentKind::Files, &self.files_document(drive))?;
        for directory in snapshot.directories() {
            utils::drive_path_to_relative(directory)?;
        }
        for (_, filename, id) in snapshot.files() {
            utils::validate_filename(filename)?;
            utils::validate_filename(id)?;
        }
        Ok(snapshot)
    }

    /// Load the activity log of `drive`
    pub fn load_activity_log(&self, drive: &str) -> Result<ActivityLog> {
        load_document(DocumentKind::Activities, &self.activities_document(drive))
    }
}

fn load_document<T: DeserializeOwned>(kind: DocumentKind, path: &Path) -> Result<T> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DeslushError::MissingDocument {
                kind,
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    debug!("Loaded {} document {:?} ({} bytes)", kind, path, content.len());
    serde_json::from_slice(&content).map_err(|e| DeslushError::MalformedDocument {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
