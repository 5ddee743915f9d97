//! Update pipeline
//!
//! ```text
//! discover keys → edit stats → progress → report → CSV artifacts (+ SQLite mirror) → publish
//! ```
//!
//! Each stage turns a failure into the message shown to the user, logs it and
//! stops the run. Nothing from a failed run is published.

use crate::config::TrackingConfig;
use crate::publisher::{
    publish_artifacts, PublishArtifact, PublishFailure, PublishStage, PublishSummary, Publisher,
};
use crate::tracking_core::{
    aggregate_edit_stats, aggregate_progress, discover_keys, ArtifactError, ArtifactLayout, BackendType,
    CsvRowSource, ReportWriter, RowSource, RunId, SqliteRowSource, TrackingError, TrackingReport,
    TrackingResult, WrittenArtifact,
};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    DiscoverKeys,
    EditStats,
    Progress,
    WriteArtifacts,
    Mirror,
    Publish(PublishStage),
}

#[derive(Debug)]
pub enum UpdateCause {
    Tracking(TrackingError),
    Artifacts(Vec<ArtifactError>),
    Publish(PublishFailure),
}

#[derive(Debug)]
pub struct UpdateError {
    pub stage: UpdateStage,
    pub message: String,
    pub cause: UpdateCause,
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            UpdateCause::Tracking(e) => write!(f, "{} ({})", self.message, e),
            UpdateCause::Artifacts(failures) => {
                write!(f, "{} ({} artifacts failed)", self.message, failures.len())
            }
            UpdateCause::Publish(failure) => write!(f, "{} ({})", self.message, failure),
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            UpdateCause::Tracking(e) => Some(e),
            UpdateCause::Artifacts(failures) => failures
                .first()
                .map(|f| f as &(dyn std::error::Error + 'static)),
            UpdateCause::Publish(failure) => Some(failure),
        }
    }
}

/// Message shown to the user for a failed stage
pub fn stage_message(stage: UpdateStage, run: Option<&RunId>) -> String {
    match stage {
        UpdateStage::DiscoverKeys => "The selected Feature Class does not have the required fields Editor or TeamTMU. \
             Choose a different Feature Class"
            .to_string(),
        UpdateStage::EditStats => "The selected Feature Class does not have the required fields POLY_CT, \
             POLY_AREA_ACRES, POLY_LENGTH_KM, or MAPPING_HRS. Choose a different Feature Class"
            .to_string(),
        UpdateStage::Progress => {
            "The selected Feature Class does not have the required fields. Choose a different Feature Class"
                .to_string()
        }
        UpdateStage::WriteArtifacts => "Failed to write the tracking CSV files.".to_string(),
        UpdateStage::Mirror => "Failed to update the SQLite tracking mirror.".to_string(),
        UpdateStage::Publish(PublishStage::Authenticate) => "Invalid credentials for uploading to the portal. \
             Check PORTAL_TOKEN or PORTAL_USERNAME and PORTAL_PASSWORD."
            .to_string(),
        UpdateStage::Publish(PublishStage::Upload) => "Failed to add tracking CSV files to the portal. \
             Ensure that these CSVs do not already exist on the portal for this script to run."
            .to_string(),
        UpdateStage::Publish(PublishStage::Discover) => format!(
            "Unable to find {} on the portal. If this table has not been created, use the tracking_setup \
             tool and ensure the name matches the project folder.",
            run.map(|r| r.service_name())
                .unwrap_or_else(|| "the tracking table service".to_string())
        ),
        UpdateStage::Publish(PublishStage::Append) => "Error with adding CSV data to service.".to_string(),
    }
}

fn fail(stage: UpdateStage, run: Option<&RunId>, cause: UpdateCause) -> UpdateError {
    let error = UpdateError {
        stage,
        message: stage_message(stage, run),
        cause,
    };
    log::error!("❌ {}", error);
    error
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Overrides the project name taken from the first team
    pub project_name: Option<String>,
    pub output_root: PathBuf,
    pub date: NaiveDate,
    pub backend: BackendType,
    /// SQLite mirror location; defaults to `tracking.db` in the tracking folder
    pub mirror_db_path: Option<PathBuf>,
}

impl UpdateOptions {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            project_name: None,
            output_root: output_root.into(),
            date: chrono::Local::now().date_naive(),
            backend: BackendType::Csv,
            mirror_db_path: None,
        }
    }

    pub fn from_config(config: &TrackingConfig, source_path: &Path, backend: BackendType) -> Self {
        Self {
            project_name: config.project_name.clone(),
            backend,
            mirror_db_path: config.mirror_db_path.clone(),
            ..Self::new(config.output_root_for(source_path))
        }
    }
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub report: TrackingReport,
    pub artifacts: Vec<WrittenArtifact>,
    pub mirror: Vec<WrittenArtifact>,
    /// None when publishing was not requested
    pub publish: Option<PublishSummary>,
}

/// Open a checkout layer export: `.csv` files by header, anything else as a SQLite table
pub fn open_source(path: &Path, table: &str) -> TrackingResult<Box<dyn RowSource>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        Ok(Box::new(CsvRowSource::open(path)?))
    } else {
        Ok(Box::new(SqliteRowSource::open(path, table)?))
    }
}

/// Write every table, collecting one error per failed artifact
async fn write_all(
    writer: &mut ReportWriter,
    report: &TrackingReport,
    layout: &ArtifactLayout,
) -> Result<Vec<WrittenArtifact>, Vec<ArtifactError>> {
    let mut written = Vec::new();
    let mut failures = Vec::new();

    for table in report.tables() {
        match writer.write_table(&table).await {
            Ok(artifact) => written.push(artifact),
            Err(source) => {
                log::error!("❌ Could not write {}: {}", table.kind.file_stem(), source);
                failures.push(ArtifactError {
                    kind: table.kind,
                    path: layout.artifact_path(table.kind),
                    source,
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(failures)
    }
}

/// Run the whole update over one checkout layer
pub async fn run_update(
    source: &dyn RowSource,
    options: &UpdateOptions,
    publisher: Option<&mut dyn Publisher>,
) -> Result<UpdateOutcome, UpdateError> {
    log::info!("📖 Reading {}", source.describe());

    let keys = discover_keys(source)
        .map_err(|e| fail(UpdateStage::DiscoverKeys, None, UpdateCause::Tracking(e)))?;

    let project = options
        .project_name
        .as_deref()
        .map(|p| p.trim().to_string())
        .or_else(|| keys.project_name())
        .ok_or_else(|| {
            fail(
                UpdateStage::DiscoverKeys,
                None,
                UpdateCause::Tracking(TrackingError::Config(
                    "no TeamTMU values to name the project; set PROJECT_NAME".to_string(),
                )),
            )
        })?;
    let run = RunId::new(project, options.date);
    log::info!("🗂️  Project {} ({})", run.project, run.date_stamp());

    let edits = aggregate_edit_stats(source, &keys)
        .map_err(|e| fail(UpdateStage::EditStats, Some(&run), UpdateCause::Tracking(e)))?;
    let progress = aggregate_progress(source, &keys)
        .map_err(|e| fail(UpdateStage::Progress, Some(&run), UpdateCause::Tracking(e)))?;
    let report = TrackingReport::new(run.clone(), edits, progress);

    let layout = ArtifactLayout::new(&options.output_root, run.clone());
    let mut csv_writer = ReportWriter::new(BackendType::Csv, layout.clone(), PathBuf::new())
        .map_err(|e| fail(UpdateStage::WriteArtifacts, Some(&run), UpdateCause::Tracking(e)))?;
    let artifacts = write_all(&mut csv_writer, &report, &layout)
        .await
        .map_err(|failures| fail(UpdateStage::WriteArtifacts, Some(&run), UpdateCause::Artifacts(failures)))?;

    let mirror = if options.backend == BackendType::Sqlite {
        let db_path = options
            .mirror_db_path
            .clone()
            .unwrap_or_else(|| layout.tracking_dir().join("tracking.db"));
        let mut mirror_writer = ReportWriter::new(BackendType::Sqlite, layout.clone(), db_path)
            .map_err(|e| fail(UpdateStage::Mirror, Some(&run), UpdateCause::Tracking(e)))?;
        let written = write_all(&mut mirror_writer, &report, &layout)
            .await
            .map_err(|failures| fail(UpdateStage::Mirror, Some(&run), UpdateCause::Artifacts(failures)))?;
        mirror_writer
            .flush()
            .await
            .map_err(|e| fail(UpdateStage::Mirror, Some(&run), UpdateCause::Tracking(e)))?;
        written
    } else {
        Vec::new()
    };

    let publish = match publisher {
        None => {
            log::info!("Publishing disabled; artifacts left in {}", layout.output_dir().display());
            None
        }
        Some(publisher) => {
            let to_publish: Vec<PublishArtifact> = artifacts
                .iter()
                .map(|a| PublishArtifact::new(a.kind, a.path.clone()))
                .collect();
            let summary = publish_artifacts(publisher, &run.service_name(), &to_publish)
                .await
                .map_err(|failure| {
                    fail(
                        UpdateStage::Publish(failure.stage),
                        Some(&run),
                        UpdateCause::Publish(failure),
                    )
                })?;
            Some(summary)
        }
    };

    log::info!("✅ Tracking update complete for {}", run.project);
    Ok(UpdateOutcome {
        report,
        artifacts,
        mirror,
        publish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking_core::{MemoryRowSource, Value};
    use tempfile::tempdir;

    const COLUMNS: [&str; 12] = [
        "Editor",
        "TeamTMU",
        "POLY_CT",
        "POLY_AREA_ACRES",
        "POLY_LENGTH_KM",
        "MAPPING_HRS",
        "HUC12",
        "QA_REVIEW_HRS",
        "QA_REVISION_HRS",
        "QA_TOTAL_HRS",
        "FINALIZATION_HRS",
        "TOTAL_HRS",
    ];

    fn source() -> MemoryRowSource {
        MemoryRowSource::new(COLUMNS).with_row(vec![
            Value::from("Alice"),
            Value::from("RR"),
            Value::from(10i64),
            Value::from(5.0),
            Value::from(2.0),
            Value::from(3.0),
            Value::from("070102030405"),
        ])
    }

    fn options(root: &Path) -> UpdateOptions {
        UpdateOptions {
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            ..UpdateOptions::new(root)
        }
    }

    #[tokio::test]
    async fn test_run_without_publisher() {
        let dir = tempdir().unwrap();
        let outcome = run_update(&source(), &options(dir.path()), None).await.unwrap();

        assert_eq!(outcome.artifacts.len(), 4);
        assert!(outcome.mirror.is_empty());
        assert!(outcome.publish.is_none());
        assert!(dir
            .path()
            .join("RR_Project_Tracking/2024_03/RR_Editor_Tracking_2024_03_07.csv")
            .exists());
    }

    #[tokio::test]
    async fn test_sqlite_mirror_written_alongside_csv() {
        let dir = tempdir().unwrap();
        let opts = UpdateOptions {
            backend: BackendType::Sqlite,
            ..options(dir.path())
        };
        let outcome = run_update(&source(), &opts, None).await.unwrap();

        assert_eq!(outcome.artifacts.len(), 4);
        assert_eq!(outcome.mirror.len(), 4);
        assert!(dir.path().join("RR_Project_Tracking/tracking.db").exists());
    }

    #[tokio::test]
    async fn test_project_name_override() {
        let dir = tempdir().unwrap();
        let opts = UpdateOptions {
            project_name: Some(" Red River ".to_string()),
            ..options(dir.path())
        };
        let outcome = run_update(&source(), &opts, None).await.unwrap();
        assert_eq!(outcome.report.run.project, "Red River");
        assert!(outcome.artifacts[0]
            .path
            .ends_with("Red River_Project_Tracking/2024_03/Red River_Editor_Tracking_2024_03_07.csv"));
    }

    #[tokio::test]
    async fn test_stage_messages() {
        let dir = tempdir().unwrap();
        let missing_keys = MemoryRowSource::new(["Editor"]);
        let err = run_update(&missing_keys, &options(dir.path()), None).await.unwrap_err();
        assert_eq!(err.stage, UpdateStage::DiscoverKeys);
        assert!(err.message.contains("Editor or TeamTMU"));

        let no_teams = MemoryRowSource::new(COLUMNS);
        let err = run_update(&no_teams, &options(dir.path()), None).await.unwrap_err();
        assert_eq!(err.stage, UpdateStage::DiscoverKeys);
        assert!(matches!(err.cause, UpdateCause::Tracking(TrackingError::Config(_))));

        let run = RunId::new("RR", NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert!(stage_message(UpdateStage::Publish(PublishStage::Discover), Some(&run))
            .contains("RR_Tracking_Table_Service"));
    }

    #[test]
    fn test_open_source_by_extension() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("CO.CSV");
        std::fs::write(&csv_path, "Editor,TeamTMU\nAlice,RR\n").unwrap();

        let source = open_source(&csv_path, "CO").unwrap();
        assert_eq!(source.columns().unwrap(), vec!["Editor", "TeamTMU"]);

        assert!(open_source(&dir.path().join("missing.gpkg"), "CO").is_err());
    }

    #[tokio::test]
    async fn test_unwritable_output_reports_stage() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = run_update(&source(), &options(&blocker), None).await.unwrap_err();
        assert_eq!(err.stage, UpdateStage::WriteArtifacts);
        assert!(matches!(err.cause, UpdateCause::Tracking(TrackingError::Io(_))));
    }
}
