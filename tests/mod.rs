//! Main test module for Deslusher
//!
//! This module includes all test suites:
//! - Integration tests for end-to-end reconciliation scenarios
//! - Property-based tests for resolver and counter invariants
//! - Edge cases for names, paths and documents

pub mod integration;

#[cfg(all(test, unix))]
mod edge_cases {
    use crate::integration::{entries, event, is_link, WorkspaceFixture};
    use ::deslusher::*;
    use std::fs;

    #[test]
    fn test_empty_drive() {
        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("Empty", &Snapshot::new(), &ActivityLog::new());

        let report = fixture
            .deslusher("2024-01-01T00:00:00Z")
            .deslush_drive("Empty")
            .unwrap();
        assert_eq!(report.files_analyzed, 0);
        assert_eq!(report.files_restored, 0);
        assert!(report.is_fully_restored());
        assert!(report.restored_root.is_dir());
    }

    #[test]
    fn test_empty_directories_are_recreated() {
        let mut snapshot = Snapshot::new();
        snapshot.insert_directory("/Empty");
        snapshot.insert_directory("/Nested/Deeper/Empty");
        snapshot.insert("/Full", "a.txt", "a");

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &ActivityLog::new());
        fixture.deslusher("2024-01-01T00:00:00Z").deslush_drive("D").unwrap();

        assert!(fixture.restored("D", "/Empty").is_dir());
        assert!(entries(&fixture.restored("D", "/Empty")).is_empty());
        assert!(fixture.restored("D", "/Nested/Deeper/Empty").is_dir());
        assert!(is_link(&fixture.restored("D", "/Full/a.txt")));
    }

    #[test]
    fn test_special_filenames() {
        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file_with_underscores.txt",
            "file.multiple.dots.txt",
            "UPPERCASE.TXT",
            "unicode_文件.txt",
            "emoji_😀.txt",
        ];

        let mut snapshot = Snapshot::new();
        for (i, name) in special_names.iter().enumerate() {
            snapshot.insert("/Special", *name, format!("obj{}", i));
        }
        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &ActivityLog::new());
        let report = fixture.deslusher("2024-01-01T00:00:00Z").deslush_drive("D").unwrap();

        assert_eq!(report.files_restored, special_names.len());
        for name in &special_names {
            let path = fixture.restored("D", &format!("/Special/{}", name));
            assert!(is_link(&path), "{} was not restored", name);
        }
    }

    #[test]
    fn test_names_without_extension() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/Home", "Makefile", "m1");
        snapshot.insert("/Home", ".bashrc", "b1");
        snapshot.insert("/Other", "build", "m2");
        let mut log = ActivityLog::new();
        log.push("/Other/build", event("2024-01-02T00:00:00Z", "Makefile"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &log);
        fixture.deslusher("2024-01-01T00:00:00Z").deslush_drive("D").unwrap();

        // Bare ids when the name has no extension.
        assert_eq!(entries(&fixture.restored("D", "/Home/Makefile")), vec!["m1", "m2"]);
        assert!(is_link(&fixture.restored("D", "/Home/.bashrc")));
    }

    #[test]
    fn test_nested_directories_collapse_independently() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/a", "f.txt", "1");
        snapshot.insert("/a/b", "f.txt", "2");
        snapshot.insert("/a/b/c", "f.txt", "3");
        snapshot.insert("/a/b/c", "g.txt", "4");

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &ActivityLog::new());
        let report = fixture.deslusher("2024-01-01T00:00:00Z").deslush_drive("D").unwrap();

        assert_eq!(report.files_restored, 4);
        assert_eq!(entries(&fixture.restored("D", "/a")), vec!["b", "f.txt"]);
        assert_eq!(entries(&fixture.restored("D", "/a/b/c")), vec!["f.txt", "g.txt"]);
        assert_eq!(
            fs::read_to_string(fixture.restored("D", "/a/b/c/g.txt")).unwrap(),
            "content of 4"
        );
    }

    #[test]
    fn test_rename_chain_uses_last_qualifying_event() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("/A", "original.txt", "o1");
        snapshot.insert("/A", "intermediate.txt", "i1");
        snapshot.insert("/B", "final.txt", "f1");
        let mut log = ActivityLog::new();
        log.push("/B/final.txt", event("2024-01-02T00:00:00Z", "intermediate.txt"));
        log.push("/B/final.txt", event("2024-01-03T00:00:00Z", "original.txt"));

        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &snapshot, &log);
        let report = fixture.deslusher("2024-01-01T00:00:00Z").deslush_drive("D").unwrap();

        assert_eq!(report.condensed.len(), 1);
        assert_eq!(report.condensed[0].path, "/A/original.txt");
        assert!(is_link(&fixture.restored("D", "/A/intermediate.txt")));
    }

    #[test]
    fn test_traversal_in_snapshot_is_rejected() {
        let fixture = WorkspaceFixture::new();
        fs::write(fixture.root().join("onedrive-drives.json"), r#"{"D": "d"}"#).unwrap();
        fs::write(
            fixture.root().join("onedrive-files_D.json"),
            r#"{"/../escape": {"a.txt": "a"}}"#,
        )
        .unwrap();
        fs::write(fixture.root().join("onedrive-activities_D.json"), "{}").unwrap();

        let err = fixture
            .deslusher("2024-01-01T00:00:00Z")
            .deslush_drive("D")
            .unwrap_err();
        assert!(matches!(err, DeslushError::InvalidPath(_)));
        assert!(!fixture.root().join("escape").exists());
    }

    #[test]
    fn test_malformed_activities_document() {
        let mut fixture = WorkspaceFixture::new();
        fixture.add_drive("D", &Snapshot::new(), &ActivityLog::new());
        fs::write(fixture.root().join("onedrive-activities_D.json"), "[1, 2").unwrap();

        let err = fixture
            .deslusher("2024-01-01T00:00:00Z")
            .deslush_drive("D")
            .unwrap_err();
        assert!(matches!(
            err,
            DeslushError::MalformedDocument { kind: DocumentKind::Activities, .. }
        ));
    }
}
