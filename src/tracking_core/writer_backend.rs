//! Writer backend trait for tracking tables
//!
//! Defines the interface for persisting assembled report tables.

use super::error::TrackingResult;
use super::report::{ReportTable, TableKind};
use async_trait::async_trait;
use std::path::PathBuf;

/// Where a table ended up
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenArtifact {
    pub kind: TableKind,
    pub path: PathBuf,
    pub rows: usize,
}

/// Backend trait for writing report tables
#[async_trait]
pub trait ReportWriterBackend: Send {
    /// Write one table, fully replacing any previous content
    async fn write_table(&mut self, table: &ReportTable) -> TrackingResult<WrittenArtifact>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> TrackingResult<()>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
