//! Unified writer interface for tracking tables
//!
//! Routes writes to either the CSV or the SQLite backend based on configuration.

use super::csv_writer::CsvReportWriter;
use super::error::TrackingResult;
use super::report::{ArtifactLayout, ReportTable};
use super::sqlite_writer::SqliteReportWriter;
use super::writer_backend::{ReportWriterBackend, WrittenArtifact};
use crate::config::ConfigError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendType {
    Csv,
    Sqlite,
}

impl BackendType {
    /// Parse `--backend csv|sqlite` from the process arguments (CSV when absent)
    pub fn parse_from_args(args: &[String]) -> Result<BackendType, ConfigError> {
        let Some(idx) = args.iter().position(|x| x == "--backend") else {
            return Ok(BackendType::Csv);
        };
        match args.get(idx + 1).map(|s| s.as_str()) {
            Some("sqlite") => Ok(BackendType::Sqlite),
            Some("csv") => Ok(BackendType::Csv),
            Some(other) => Err(ConfigError::InvalidValue(format!(
                "--backend must be csv or sqlite, got '{}'",
                other
            ))),
            None => Err(ConfigError::InvalidValue("--backend requires a value".to_string())),
        }
    }
}

/// Unified writer that routes to either the CSV or SQLite backend
pub enum ReportWriter {
    Csv(CsvReportWriter),
    Sqlite(SqliteReportWriter),
}

impl ReportWriter {
    /// Create a new report writer; `db_path` is only used by the SQLite backend
    pub fn new(backend: BackendType, layout: ArtifactLayout, db_path: PathBuf) -> TrackingResult<Self> {
        match backend {
            BackendType::Csv => Ok(ReportWriter::Csv(CsvReportWriter::new(layout)?)),
            BackendType::Sqlite => Ok(ReportWriter::Sqlite(SqliteReportWriter::new(db_path)?)),
        }
    }

    pub async fn write_table(&mut self, table: &ReportTable) -> TrackingResult<WrittenArtifact> {
        match self {
            ReportWriter::Csv(w) => w.write_table(table).await,
            ReportWriter::Sqlite(w) => w.write_table(table).await,
        }
    }

    pub async fn flush(&mut self) -> TrackingResult<()> {
        match self {
            ReportWriter::Csv(w) => w.flush().await,
            ReportWriter::Sqlite(w) => w.flush().await,
        }
    }

    pub fn backend_type(&self) -> &'static str {
        match self {
            ReportWriter::Csv(_) => "CSV",
            ReportWriter::Sqlite(_) => "SQLite",
        }
    }
}
