//! Integration tests for the tracking update pipeline
//!
//! Runs the full update against a SQLite checkout layer (and a CSV export of
//! the same rows) with a recording in-memory publisher.
//!
//! Fixture units:
//! - 0001 Alice/T1: mapped 3 h, QA done, finalized
//! - 0002 (no editor)/T1: not started (mapping hours = 1)
//! - 0003 Bob/T2: mapped 5 h, QA not started
//! - 0004 Carol/T2: mapping in progress (mapping hours = 1)

#[cfg(test)]
mod tracking_pipeline_tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use projtrack::pipeline::{run_update, UpdateCause, UpdateOptions, UpdateStage};
    use projtrack::publisher::{
        PublishArtifact, PublishStage, Publisher, RemoteHandle, RemoteTableHandle,
    };
    use projtrack::tracking_core::{
        CsvRowSource, SqliteRowSource, TableKind, TrackingError, TrackingResult,
    };
    use rusqlite::{params, Connection};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    type Unit<'a> = (
        Option<&'a str>,
        &'a str,
        i64,
        f64,
        f64,
        f64,
        &'a str,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
    );

    const UNITS: [Unit<'static>; 4] = [
        (Some("Alice"), "T1", 10, 5.0, 2.0, 3.0, "0001", Some(1.5), Some(0.5), Some(2.0), Some(1.0), Some(6.0)),
        (None, "T1", 0, 0.0, 0.0, 1.0, "0002", None, None, None, None, None),
        (Some("Bob"), "T2", 4, 2.0, 1.0, 5.0, "0003", None, None, None, None, None),
        (Some("Carol"), "T2", 2, 1.0, 0.5, 1.0, "0004", None, None, None, None, None),
    ];

    const HEADER: &str = "Editor,TeamTMU,POLY_CT,POLY_AREA_ACRES,POLY_LENGTH_KM,MAPPING_HRS,HUC12,\
QA_REVIEW_HRS,QA_REVISION_HRS,QA_TOTAL_HRS,FINALIZATION_HRS,TOTAL_HRS";

    fn create_checkout_db(path: &Path, include_poly_ct: bool) {
        let conn = Connection::open(path).unwrap();
        let poly_ct = if include_poly_ct { "POLY_CT INTEGER," } else { "" };
        conn.execute_batch(&format!(
            "CREATE TABLE CO (
                OBJECTID INTEGER PRIMARY KEY,
                Editor TEXT,
                TeamTMU TEXT,
                {}
                POLY_AREA_ACRES REAL,
                POLY_LENGTH_KM REAL,
                MAPPING_HRS REAL,
                HUC12 TEXT,
                QA_REVIEW_HRS REAL,
                QA_REVISION_HRS REAL,
                QA_TOTAL_HRS REAL,
                FINALIZATION_HRS REAL,
                TOTAL_HRS REAL
            )",
            poly_ct
        ))
        .unwrap();

        for u in UNITS {
            if include_poly_ct {
                conn.execute(
                    "INSERT INTO CO (Editor, TeamTMU, POLY_CT, POLY_AREA_ACRES, POLY_LENGTH_KM, MAPPING_HRS,
                        HUC12, QA_REVIEW_HRS, QA_REVISION_HRS, QA_TOTAL_HRS, FINALIZATION_HRS, TOTAL_HRS)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![u.0, u.1, u.2, u.3, u.4, u.5, u.6, u.7, u.8, u.9, u.10, u.11],
                )
                .unwrap();
            } else {
                conn.execute(
                    "INSERT INTO CO (Editor, TeamTMU, POLY_AREA_ACRES, POLY_LENGTH_KM, MAPPING_HRS,
                        HUC12, QA_REVIEW_HRS, QA_REVISION_HRS, QA_TOTAL_HRS, FINALIZATION_HRS, TOTAL_HRS)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![u.0, u.1, u.3, u.4, u.5, u.6, u.7, u.8, u.9, u.10, u.11],
                )
                .unwrap();
            }
        }
    }

    fn create_checkout_csv(path: &Path) {
        let cell = |v: Option<f64>| v.map(|x| format!("{:?}", x)).unwrap_or_default();
        let mut text = format!("{}\n", HEADER);
        for u in UNITS {
            text.push_str(&format!(
                "{},{},{},{:?},{:?},{:?},{},{},{},{},{},{}\n",
                u.0.unwrap_or(""),
                u.1,
                u.2,
                u.3,
                u.4,
                u.5,
                u.6,
                cell(u.7),
                cell(u.8),
                cell(u.9),
                cell(u.10),
                cell(u.11)
            ));
        }
        std::fs::write(path, text).unwrap();
    }

    struct Fixture {
        dir: TempDir,
        source: SqliteRowSource,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let db_path = dir.path().join("checkout.gpkg");
            create_checkout_db(&db_path, true);
            let source = SqliteRowSource::open(&db_path, "CO").unwrap();
            Self { dir, source }
        }

        fn options(&self) -> UpdateOptions {
            UpdateOptions {
                date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
                ..UpdateOptions::new(self.dir.path().join("out"))
            }
        }

        fn artifact(&self, kind: TableKind) -> PathBuf {
            self.dir
                .path()
                .join("out/T1_Project_Tracking/2024_03")
                .join(format!("T1_{}_2024_03_07.csv", kind.file_stem()))
        }

        fn read(&self, kind: TableKind) -> Vec<String> {
            std::fs::read_to_string(self.artifact(kind))
                .unwrap()
                .lines()
                .map(|l| l.to_string())
                .collect()
        }
    }

    /// Records every call; uploads read the artifact from disk
    #[derive(Default)]
    struct RecordingPublisher {
        fail_upload: HashSet<TableKind>,
        calls: Mutex<Vec<String>>,
        uploaded_headers: Mutex<Vec<String>>,
    }

    impl RecordingPublisher {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn authenticate(&mut self) -> TrackingResult<()> {
            self.record("authenticate".to_string());
            Ok(())
        }

        async fn publish(&self, artifact: &PublishArtifact) -> TrackingResult<RemoteHandle> {
            self.record(format!("publish {}", artifact.title));
            if self.fail_upload.contains(&artifact.kind) {
                return Err(TrackingError::RemoteConflict(format!("{} already exists", artifact.title)));
            }
            let content = std::fs::read_to_string(&artifact.path)?;
            self.uploaded_headers
                .lock()
                .unwrap()
                .push(content.lines().next().unwrap_or_default().to_string());
            Ok(RemoteHandle {
                item_id: format!("item{}", artifact.kind.service_index()),
                kind: artifact.kind,
                title: artifact.title.clone(),
                source_info: serde_json::json!({"type": "csv"}),
            })
        }

        async fn discover_service(&self, name: &str) -> TrackingResult<Vec<RemoteTableHandle>> {
            self.record(format!("discover {}", name));
            Ok(TableKind::all()
                .iter()
                .map(|k| RemoteTableHandle {
                    service_url: "https://services.example.org/FeatureServer".to_string(),
                    layer_id: k.service_index() as u64,
                    name: k.hosted_table_name("T1"),
                })
                .collect())
        }

        async fn append_upsert(
            &self,
            table: &RemoteTableHandle,
            artifact: &PublishArtifact,
            handle: &RemoteHandle,
            key_column: &str,
        ) -> TrackingResult<()> {
            self.record(format!(
                "append {} <- {} ({}) on {}",
                table.name, artifact.title, handle.item_id, key_column
            ));
            Ok(())
        }

        async fn cleanup(&self, handle: &RemoteHandle) -> TrackingResult<()> {
            self.record(format!("cleanup {}", handle.item_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_artifacts_match_expected_tables() {
        let fx = Fixture::new();
        let outcome = run_update(&fx.source, &fx.options(), None).await.unwrap();
        assert_eq!(outcome.artifacts.len(), 4);

        // Scenario A plus the division guard for Carol (only sentinel hours)
        assert_eq!(
            fx.read(TableKind::EditorTracking),
            vec![
                "Editor,Poly_Ct,Poly_Length_KM,Poly_Area_Acres,Map_Hrs,Poly_Per_Hr,Acres_Per_Hr,KM_Per_Hr",
                "Alice,10,2.0,5.0,3.0,3.33,1.67,0.67",
                "Bob,4,1.0,2.0,5.0,0.8,0.4,0.2",
                "Carol,2,0.5,1.0,0.0,0.0,0.0,0.0",
            ]
        );

        assert_eq!(
            fx.read(TableKind::TeamEditTracking),
            vec![
                "Team,Poly_Ct,Poly_Length_KM,Poly_Area_Acres,Map_Hrs,Poly_Per_Hr,Acres_Per_Hr,KM_Per_Hr",
                "T1,10,2.0,5.0,3.0,3.33,1.67,0.67",
                "T2,6,1.5,3.0,5.0,1.2,0.6,0.3",
            ]
        );

        assert_eq!(
            fx.read(TableKind::TeamTracking),
            vec![
                "Team,Sum_Map_Time,Sum_QA_Time,Sum_Finalize_Time,Sum_Total_Time",
                "T1,3.0,2.0,1.0,6.0",
                "T2,5.0,0.0,0.0,0.0",
            ]
        );

        // Scenarios B, C and E
        assert_eq!(
            fx.read(TableKind::ProjectTracking),
            vec![
                "Team,Total_HUCs,HUCs_Not_Started,HUCs_Mapping_IP,HUCs_Mapped,HUCs_QA_IP,HUCs_QA_Done,\
HUCs_Finalize_IP,HUCs_Finalized,Mean_Map_Time,Mean_QA_Time,Mean_Finalize_Time,Mean_Total_Time",
                "T1,2,1,0,1,0,1,0,1,3.0,2.0,1.0,6.0",
                "T2,2,0,1,1,1,0,0,0,5.0,0.0,0.0,0.0",
            ]
        );
    }

    #[tokio::test]
    async fn test_keys_come_only_from_discovery() {
        let fx = Fixture::new();
        let outcome = run_update(&fx.source, &fx.options(), None).await.unwrap();
        let report = outcome.report;

        assert_eq!(report.edits.editors.keys(), &["Alice", "Bob", "Carol"]);
        assert_eq!(report.edits.teams.keys(), &["T1", "T2"]);
        assert_eq!(report.progress.team_time.keys(), &["T1", "T2"]);
        assert_eq!(report.progress.project.keys(), &["T1", "T2"]);
    }

    #[tokio::test]
    async fn test_missing_poly_ct_fails_before_any_csv() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("checkout.gpkg");
        create_checkout_db(&db_path, false);
        let source = SqliteRowSource::open(&db_path, "CO").unwrap();
        let options = UpdateOptions::new(dir.path().join("out"));

        let err = run_update(&source, &options, None).await.unwrap_err();
        assert_eq!(err.stage, UpdateStage::EditStats);
        match err.cause {
            UpdateCause::Tracking(TrackingError::Schema { missing }) => assert_eq!(missing, vec!["POLY_CT"]),
            other => panic!("expected schema error, got {:?}", other),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_rerun_is_identical() {
        let fx = Fixture::new();
        let first = run_update(&fx.source, &fx.options(), None).await.unwrap();
        let first_csv = fx.read(TableKind::ProjectTracking);

        let second = run_update(&fx.source, &fx.options(), None).await.unwrap();
        assert_eq!(first.report, second.report);
        assert_eq!(first_csv, fx.read(TableKind::ProjectTracking));
        assert_eq!(first.artifacts, second.artifacts);
    }

    #[tokio::test]
    async fn test_csv_export_matches_sqlite_source() {
        let fx = Fixture::new();
        let csv_path = fx.dir.path().join("checkout.csv");
        create_checkout_csv(&csv_path);
        let csv_source = CsvRowSource::open(&csv_path).unwrap();

        let from_db = run_update(&fx.source, &fx.options(), None).await.unwrap();
        let from_csv = run_update(&csv_source, &fx.options(), None).await.unwrap();
        assert_eq!(from_db.report, from_csv.report);
    }

    #[tokio::test]
    async fn test_publishes_every_artifact() {
        let fx = Fixture::new();
        let mut publisher = RecordingPublisher::default();

        let outcome = run_update(&fx.source, &fx.options(), Some(&mut publisher))
            .await
            .unwrap();
        let summary = outcome.publish.unwrap();
        assert_eq!(summary.appended, TableKind::all().to_vec());
        assert!(summary.failures.is_empty());

        let calls = publisher.calls();
        assert_eq!(calls[0], "authenticate");
        assert_eq!(calls[1], "publish T1_Editor_Tracking_2024_03_07.csv");
        assert_eq!(calls[5], "discover T1_Tracking_Table_Service");
        assert_eq!(
            calls[6],
            "append T1_Editor_Tracking_Table <- T1_Editor_Tracking_2024_03_07.csv (item0) on Editor"
        );
        assert_eq!(
            calls[9],
            "append T1_Project_Tracking_Table <- T1_Project_Tracking_2024_03_07.csv (item3) on Team"
        );
        assert_eq!(&calls[10..], &["cleanup item0", "cleanup item1", "cleanup item2", "cleanup item3"]);

        let headers = publisher.uploaded_headers.lock().unwrap();
        assert!(headers[0].starts_with("Editor,Poly_Ct"));
        assert!(headers[2].starts_with("Team,Sum_Map_Time"));
    }

    #[tokio::test]
    async fn test_upload_failure_reported_per_artifact() {
        let fx = Fixture::new();
        let mut publisher = RecordingPublisher::default();
        publisher.fail_upload.insert(TableKind::TeamTracking);

        let err = run_update(&fx.source, &fx.options(), Some(&mut publisher))
            .await
            .unwrap_err();
        assert_eq!(err.stage, UpdateStage::Publish(PublishStage::Upload));
        assert!(err.message.contains("do not already exist"));

        let UpdateCause::Publish(failure) = err.cause else {
            panic!("expected publish failure");
        };
        assert_eq!(failure.summary.failures.len(), 1);
        assert_eq!(failure.summary.failures[0].kind, TableKind::TeamTracking);
        assert_eq!(failure.summary.failures[0].path, fx.artifact(TableKind::TeamTracking));
        assert_eq!(failure.summary.uploaded.len(), 3);

        // CSVs stay on disk and nothing touched the hosted tables
        assert!(fx.artifact(TableKind::TeamTracking).exists());
        assert!(!publisher.calls().iter().any(|c| c.starts_with("append")));
    }
}
