//! Tracking Core - Progress and Productivity Statistics
//!
//! Tabulates the checkout layer into editor, team and project progress tables
//! and writes them out as dated artifacts.
//!
//! # Architecture
//!
//! ```text
//! RowSource (SQLite / CSV / memory)
//!     ↓
//! discover_keys            (Editor, TeamTMU → fixed key sets)
//!     ↓
//! aggregate_edit_stats     (counts, area, length, hours → per-hour rates)
//!     ↓
//! aggregate_progress       (stage counts, hour sums → mean stage times)
//!     ↓
//! TrackingReport → ReportWriter → CSV artifacts or SQLite mirror
//! ```

pub mod csv_source;
pub mod csv_writer;
pub mod edit_stats;
pub mod error;
pub mod fields;
pub mod keys;
pub mod progress;
pub mod records;
pub mod report;
pub mod row_source;
pub mod sqlite_source;
pub mod sqlite_writer;
pub mod writer;
pub mod writer_backend;

pub use csv_source::CsvRowSource;
pub use csv_writer::CsvReportWriter;
pub use edit_stats::{aggregate_edit_stats, EditStats};
pub use error::{ArtifactError, TrackingError, TrackingResult};
pub use keys::{discover_keys, KeySets};
pub use progress::{aggregate_progress, ProgressStats};
pub use records::{EditRecord, KeyedTable, ProjectProgressRecord, TeamProgressRecord};
pub use report::{ArtifactLayout, Cell, ReportTable, RunId, TableKind, TrackingReport};
pub use row_source::{MemoryRowSource, Row, RowSource, Value};
pub use sqlite_source::SqliteRowSource;
pub use sqlite_writer::SqliteReportWriter;
pub use writer::{BackendType, ReportWriter};
pub use writer_backend::{ReportWriterBackend, WrittenArtifact};
