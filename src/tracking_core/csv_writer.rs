//! CSV writer for tracking tables
//!
//! Each table goes to a `.tmp` sibling first and is renamed over the dated
//! artifact, so a failed write never leaves a half-written CSV behind.

use super::error::TrackingResult;
use super::report::{ArtifactLayout, ReportTable};
use super::writer_backend::{ReportWriterBackend, WrittenArtifact};
use async_trait::async_trait;
use std::path::Path;

pub struct CsvReportWriter {
    layout: ArtifactLayout,
}

impl CsvReportWriter {
    pub fn new(layout: ArtifactLayout) -> TrackingResult<Self> {
        let dir = layout.ensure_dirs()?;
        log::info!("📝 Writing tracking CSVs to: {}", dir.display());
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn write_table_sync(&self, table: &ReportTable) -> TrackingResult<WrittenArtifact> {
        let path = self.layout.artifact_path(table.kind);
        let tmp_path = path.with_extension("csv.tmp");

        if let Err(e) = write_csv(&tmp_path, table) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        std::fs::rename(&tmp_path, &path)?;

        log::info!("📝 {} rows → {}", table.rows.len(), path.display());
        Ok(WrittenArtifact {
            kind: table.kind,
            path,
            rows: table.rows.len(),
        })
    }
}

fn write_csv(path: &Path, table: &ReportTable) -> TrackingResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.header())?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[async_trait]
impl ReportWriterBackend for CsvReportWriter {
    async fn write_table(&mut self, table: &ReportTable) -> TrackingResult<WrittenArtifact> {
        self.write_table_sync(table)
    }

    async fn flush(&mut self) -> TrackingResult<()> {
        // Every table is flushed and renamed as it is written
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}
