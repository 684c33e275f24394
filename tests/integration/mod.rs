//! Scenario tests for Deslusher
//!
//! Each test writes a complete workspace (drives, files and activities
//! documents plus a content store) and runs the engine end to end.

use ::deslusher::*;
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A workspace on disk built from in-memory documents
pub struct WorkspaceFixture {
    pub temp_dir: TempDir,
    drives: serde_json::Map<String, serde_json::Value>,
}

impl WorkspaceFixture {
    /// Create an empty workspace
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("objects")).unwrap();
        Self {
            temp_dir,
            drives: serde_json::Map::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a drive with its snapshot and activity log, and store every
    /// referenced object
    pub fn add_drive(&mut self, name: &str, snapshot: &Snapshot, log: &ActivityLog) {
        self.try_add_drive(name, snapshot, log).unwrap();
    }

    fn try_add_drive(&mut self, name: &str, snapshot: &Snapshot, log: &ActivityLog) -> anyhow::Result<()> {
        self.drives.insert(name.to_string(), json!(format!("drive-{}", name)));
        self.write_document("onedrive-drives.json", &self.drives)?;
        self.write_document(&format!("onedrive-files_{}.json", name), snapshot)?;
        self.write_document(&format!("onedrive-activities_{}.json", name), log)?;
        for (_, _, id) in snapshot.files() {
            let object = self.root().join("objects").join(id);
            fs::write(&object, format!("content of {}", id))
                .with_context(|| format!("writing object {:?}", object))?;
        }
        Ok(())
    }

    fn write_document(&self, file_name: &str, document: &impl Serialize) -> anyhow::Result<()> {
        let path = self.root().join(file_name);
        let content = serde_json::to_vec(document)?;
        fs::write(&path, content).with_context(|| format!("writing document {:?}", path))
    }

    pub fn deslusher(&self, cutoff: &str) -> Deslusher {
        DeslusherBuilder::new()
            .cutoff(utils::parse_timestamp(cutoff).unwrap())
            .build(self.root())
            .unwrap()
    }

    /// On-disk location of a drive path in the restored tree
    pub fn restored(&self, drive: &str, path: &str) -> PathBuf {
        self.root()
            .join("onedrive")
            .join(format!("{}-deslushed", drive))
            .join(path.trim_start_matches('/'))
    }

    pub fn object(&self, id: &str) -> PathBuf {
        self.root().join("objects").join(id)
    }
}

pub fn event(timestamp: &str, prior_name: &str) -> RenameEvent {
    RenameEvent::new(utils::parse_timestamp(timestamp).unwrap(), prior_name)
}

pub fn is_link(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(unix)]
mod scenarios {
    use super::*;

    #[test]
    fn test_renamed_file_competes_with_current_owner_of_its_name() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/A", "x.txt", "id1");
        snapshot.insert("/B", "y.txt", "id2");
        let mut log = ActivityLog::new();
        log.push("/B/y.txt", event("2024-01-01T00:00:00Z", "x.txt"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("Documents", &snapshot, &log);
        let report = fixture
            .deslusher("2023-12-01T00:00:00Z")
            .deslush_drive("Documents")
            .unwrap();

        // Both files land in the same candidate directory; neither overwrites the other.
        let candidate = fixture.restored("Documents", "/A/x.txt");
        assert!(candidate.is_dir());
        assert_eq!(entries(&candidate), vec!["id1.txt", "id2.txt"]);
        assert_eq!(fs::read_link(candidate.join("id1.txt")).unwrap(), fixture.object("id1"));
        assert_eq!(fs::read_link(candidate.join("id2.txt")).unwrap(), fixture.object("id2"));

        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.files_restored, 0);
        assert_eq!(report.condensed_directories(), 1);
        assert_eq!(report.total_candidates(), 2);
        assert_eq!(report.condensed[0].path, "/A/x.txt");

        // The renamed file's current location gets no candidate.
        assert!(!fixture.restored("Documents", "/B/y.txt").exists());
        assert!(fixture.restored("Documents", "/B").is_dir());
    }

    #[test]
    fn test_renamed_file_restored_into_sibling_folder() {
        // /Reports/2023 keeps a different file under the original name and
        // /Scans holds the renamed one.
        let mut snapshot = Snapshot::new();
        snapshot.insert("/Reports", "summary.pdf", "r1");
        snapshot.insert("/Reports/2023", "q4.xlsx", "r2");
        snapshot.insert("/Scans", "scan_0001.pdf", "s1");
        let mut log = ActivityLog::new();
        log.push("/Scans/scan_0001.pdf", event("2024-02-02T12:00:00Z", "q4.xlsx"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("Documents", &snapshot, &log);
        let report = fixture
            .deslusher("2024-02-01T00:00:00Z")
            .deslush_drive("Documents")
            .unwrap();

        let summary = fixture.restored("Documents", "/Reports/summary.pdf");
        assert!(is_link(&summary));
        assert_eq!(fs::read_to_string(&summary).unwrap(), "content of r1");

        let q4 = fixture.restored("Documents", "/Reports/2023/q4.xlsx");
        assert!(q4.is_dir());
        // The scanned file inherits the extension of its original name.
        assert_eq!(entries(&q4), vec!["r2.xlsx", "s1.xlsx"]);

        assert_eq!(report.files_restored, 1);
        assert_eq!(report.files_renamed, 1);
        assert_eq!(report.total_candidates(), 2);
    }

    #[test]
    fn test_single_candidate_collapses_to_link_with_restored_name() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/A", "x.txt", "id1");
        snapshot.insert("/A", "y.txt", "id2");
        let mut log = ActivityLog::new();
        // y.txt was called "draft.txt" but nothing carries that name any more.
        log.push("/A/y.txt", event("2024-01-05T00:00:00Z", "draft.txt"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("Documents", &snapshot, &log);
        let report = fixture
            .deslusher("2024-01-01T00:00:00Z")
            .deslush_drive("Documents")
            .unwrap();

        let restored = fixture.restored("Documents", "/A/x.txt");
        assert!(is_link(&restored));
        assert_eq!(fs::read_link(&restored).unwrap(), fixture.object("id1"));
        assert_eq!(entries(&fixture.restored("Documents", "/A")), vec!["x.txt"]);

        assert_eq!(report.files_restored, 1);
        assert_eq!(report.condensed_directories(), 0);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].original_name, "draft.txt");
        // Excluded from both restored and condensed counts.
        assert!(report.files_restored + report.total_candidates() < report.files_analyzed);
    }

    #[test]
    fn test_events_before_cutoff_are_ignored() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/A", "x.txt", "id1");
        snapshot.insert("/B", "y.txt", "id2");
        let mut log = ActivityLog::new();
        log.push("/B/y.txt", event("2023-06-01T00:00:00Z", "x.txt"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("Documents", &snapshot, &log);
        let report = fixture
            .deslusher("2024-01-01T00:00:00Z")
            .deslush_drive("Documents")
            .unwrap();

        assert_eq!(report.files_renamed, 0);
        assert_eq!(report.files_restored, 2);
        assert!(is_link(&fixture.restored("Documents", "/A/x.txt")));
        assert!(is_link(&fixture.restored("Documents", "/B/y.txt")));
    }

    #[test]
    fn test_multi_drive_reports_are_independent() {
        let mut documents = Snapshot::new();
        documents.insert("/A", "x.txt", "d1");
        documents.insert("/B", "y.txt", "d2");
        let mut documents_log = ActivityLog::new();
        documents_log.push("/B/y.txt", event("2024-01-01T00:00:00Z", "x.txt"));

        let mut archive = Snapshot::new();
        archive.insert("/Old", "a.txt", "a1");
        let archive_log = ActivityLog::new();

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("Documents", &documents, &documents_log);
        fixture.add_drive("Archive", &archive, &archive_log);

        let report = fixture.deslusher("2023-12-01T00:00:00Z").deslush().unwrap();
        assert_eq!(report.drives.len(), 2);

        let archive_report = report.drives.iter().find(|d| d.drive == "Archive").unwrap();
        assert_eq!(archive_report.files_analyzed, 1);
        assert_eq!(archive_report.files_restored, 1);
        assert!(archive_report.is_fully_restored());

        let documents_report = report.drives.iter().find(|d| d.drive == "Documents").unwrap();
        assert_eq!(documents_report.condensed_directories(), 1);

        assert_eq!(report.files_analyzed(), 3);
        assert_eq!(report.files_restored(), 1);
        assert!(is_link(&fixture.restored("Archive", "/Old/a.txt")));
    }

    #[test]
    fn test_chronological_order_option() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/A", "first.txt", "f1");
        snapshot.insert("/A", "second.txt", "f2");
        snapshot.insert("/B", "current.txt", "c1");
        let mut log = ActivityLog::new();
        // Newest event listed first.
        log.push("/B/current.txt", event("2024-03-01T00:00:00Z", "second.txt"));
        log.push("/B/current.txt", event("2024-02-01T00:00:00Z", "first.txt"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &log);
        let cutoff = utils::parse_timestamp("2024-01-01T00:00:00Z").unwrap();

        let recorded = DeslusherBuilder::new().cutoff(cutoff).build(fixture.root()).unwrap();
        let report = recorded.deslush_drive("D").unwrap();
        assert_eq!(report.condensed[0].path, "/A/first.txt");

        let chronological = DeslusherBuilder::new()
            .cutoff(cutoff)
            .event_order(EventOrder::Chronological)
            .build(fixture.root())
            .unwrap();
        let report = chronological.deslush_drive("D").unwrap();
        assert_eq!(report.condensed[0].path, "/A/second.txt");
        assert!(is_link(&fixture.restored("D", "/A/first.txt")));
    }

    #[test]
    fn test_restored_tree_passes_verification() {
        let mut snapshot = Snapshot::new();
        for dir in 0..4 {
            for file in 0..5 {
                snapshot.insert(format!("/dir{}", dir), format!("file{}.txt", file), format!("id{}_{}", dir, file));
            }
        }
        let mut log = ActivityLog::new();
        log.push("/dir3/file4.txt", event("2024-01-02T00:00:00Z", "file0.txt"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &log);
        let deslusher = fixture.deslusher("2024-01-01T00:00:00Z");
        let report = deslusher.deslush_drive("D").unwrap();

        // file0.txt exists in every folder, so the renamed file competes in all four.
        assert_eq!(report.condensed_directories(), 4);
        assert_eq!(report.total_candidates(), 8);
        assert_eq!(report.files_restored, 15);

        let verification = deslusher.verify_restored("D").unwrap();
        assert!(verification.is_valid(), "{}", verification.summary());
        assert_eq!(verification.links_checked, 15 + 8);
    }

    #[test]
    fn test_rerun_replaces_previous_output() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/A", "x.txt", "id1");
        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &ActivityLog::new());
        let deslusher = fixture.deslusher("2024-01-01T00:00:00Z");
        deslusher.deslush_drive("D").unwrap();

        // Leftovers of an interrupted run.
        let stale = fixture.restored("D", "/A/y.txt.deslushed_0000");
        fs::create_dir_all(&stale).unwrap();

        deslusher.deslush_drive("D").unwrap();
        assert!(!stale.exists());
        assert_eq!(entries(&fixture.restored("D", "/A")), vec!["x.txt"]);
    }
}
