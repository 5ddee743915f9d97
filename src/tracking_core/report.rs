//! Report assembly
//!
//! Turns the aggregation results into four fixed-layout tables and decides
//! where their artifacts live on disk.

use super::edit_stats::EditStats;
use super::error::TrackingResult;
use super::progress::ProgressStats;
use super::records::{EditRecord, KeyedTable};
use chrono::NaiveDate;
use std::path::PathBuf;

/// The four tracking tables, in hosted-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    EditorTracking,
    TeamEditTracking,
    TeamTracking,
    ProjectTracking,
}

const EDIT_COLUMNS_TAIL: [&str; 7] = [
    "Poly_Ct",
    "Poly_Length_KM",
    "Poly_Area_Acres",
    "Map_Hrs",
    "Poly_Per_Hr",
    "Acres_Per_Hr",
    "KM_Per_Hr",
];

const EDITOR_HEADER: [&str; 8] = [
    "Editor",
    EDIT_COLUMNS_TAIL[0],
    EDIT_COLUMNS_TAIL[1],
    EDIT_COLUMNS_TAIL[2],
    EDIT_COLUMNS_TAIL[3],
    EDIT_COLUMNS_TAIL[4],
    EDIT_COLUMNS_TAIL[5],
    EDIT_COLUMNS_TAIL[6],
];

const TEAM_EDIT_HEADER: [&str; 8] = [
    "Team",
    EDIT_COLUMNS_TAIL[0],
    EDIT_COLUMNS_TAIL[1],
    EDIT_COLUMNS_TAIL[2],
    EDIT_COLUMNS_TAIL[3],
    EDIT_COLUMNS_TAIL[4],
    EDIT_COLUMNS_TAIL[5],
    EDIT_COLUMNS_TAIL[6],
];

const TEAM_TIME_HEADER: [&str; 5] = [
    "Team",
    "Sum_Map_Time",
    "Sum_QA_Time",
    "Sum_Finalize_Time",
    "Sum_Total_Time",
];

const PROJECT_HEADER: [&str; 13] = [
    "Team",
    "Total_HUCs",
    "HUCs_Not_Started",
    "HUCs_Mapping_IP",
    "HUCs_Mapped",
    "HUCs_QA_IP",
    "HUCs_QA_Done",
    "HUCs_Finalize_IP",
    "HUCs_Finalized",
    "Mean_Map_Time",
    "Mean_QA_Time",
    "Mean_Finalize_Time",
    "Mean_Total_Time",
];

impl TableKind {
    pub fn all() -> [TableKind; 4] {
        [
            TableKind::EditorTracking,
            TableKind::TeamEditTracking,
            TableKind::TeamTracking,
            TableKind::ProjectTracking,
        ]
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            TableKind::EditorTracking => "Editor_Tracking",
            TableKind::TeamEditTracking => "Team_Edit_Tracking",
            TableKind::TeamTracking => "Team_Tracking",
            TableKind::ProjectTracking => "Project_Tracking",
        }
    }

    pub fn header(&self) -> &'static [&'static str] {
        match self {
            TableKind::EditorTracking => &EDITOR_HEADER,
            TableKind::TeamEditTracking => &TEAM_EDIT_HEADER,
            TableKind::TeamTracking => &TEAM_TIME_HEADER,
            TableKind::ProjectTracking => &PROJECT_HEADER,
        }
    }

    /// Column the hosted table's unique index and upsert match on
    pub fn key_column(&self) -> &'static str {
        match self {
            TableKind::EditorTracking => "Editor",
            _ => "Team",
        }
    }

    /// Position of this table inside the hosted table service
    pub fn service_index(&self) -> usize {
        match self {
            TableKind::EditorTracking => 0,
            TableKind::TeamEditTracking => 1,
            TableKind::TeamTracking => 2,
            TableKind::ProjectTracking => 3,
        }
    }

    /// Hosted table name created by the setup tool
    pub fn hosted_table_name(&self, project: &str) -> String {
        format!("{}_{}_Table", project, self.file_stem())
    }

    /// Storage type of a header column
    pub fn column_type(&self, column: &str) -> ColumnType {
        if column == self.key_column() {
            ColumnType::Key
        } else if column == "Poly_Ct" || column == "Total_HUCs" || column.starts_with("HUCs_") {
            ColumnType::Integer
        } else {
            ColumnType::Double
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Unique text key (Editor or Team)
    Key,
    Integer,
    Double,
}

/// A single output cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" on whole numbers
            Cell::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// One fully assembled tracking table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub kind: TableKind,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn header(&self) -> &'static [&'static str] {
        self.kind.header()
    }
}

/// Identifies one run: project name plus the local date
#[derive(Debug, Clone, PartialEq)]
pub struct RunId {
    pub project: String,
    pub date: NaiveDate,
}

impl RunId {
    pub fn new(project: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            project: project.into(),
            date,
        }
    }

    pub fn today(project: impl Into<String>) -> Self {
        Self::new(project, chrono::Local::now().date_naive())
    }

    pub fn date_stamp(&self) -> String {
        self.date.format("%Y_%m_%d").to_string()
    }

    pub fn month_stamp(&self) -> String {
        self.date.format("%Y_%m").to_string()
    }

    pub fn service_name(&self) -> String {
        format!("{}_Tracking_Table_Service", self.project)
    }
}

/// Directory and file naming for a run's artifacts
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
    run: RunId,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>, run: RunId) -> Self {
        Self {
            root: root.into(),
            run,
        }
    }

    /// `{root}/{project}_Project_Tracking`
    pub fn tracking_dir(&self) -> PathBuf {
        self.root
            .join(format!("{}_Project_Tracking", self.run.project))
    }

    /// `{root}/{project}_Project_Tracking/{YYYY_MM}`
    pub fn output_dir(&self) -> PathBuf {
        self.tracking_dir().join(self.run.month_stamp())
    }

    pub fn file_name(&self, kind: TableKind) -> String {
        format!(
            "{}_{}_{}.csv",
            self.run.project,
            kind.file_stem(),
            self.run.date_stamp()
        )
    }

    pub fn artifact_path(&self, kind: TableKind) -> PathBuf {
        self.output_dir().join(self.file_name(kind))
    }

    /// Create the month directory (and parents) if needed
    pub fn ensure_dirs(&self) -> TrackingResult<PathBuf> {
        let dir = self.output_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// All four result tables of one run
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingReport {
    pub run: RunId,
    pub edits: EditStats,
    pub progress: ProgressStats,
}

fn edit_rows(table: &KeyedTable<EditRecord>) -> Vec<Vec<Cell>> {
    table
        .iter()
        .map(|(key, r)| {
            vec![
                Cell::Text(key.to_string()),
                Cell::Int(r.poly_ct),
                Cell::Float(r.length_km),
                Cell::Float(r.area_acres),
                Cell::Float(r.map_hrs),
                Cell::Float(r.poly_per_hr),
                Cell::Float(r.acres_per_hr),
                Cell::Float(r.km_per_hr),
            ]
        })
        .collect()
}

impl TrackingReport {
    pub fn new(run: RunId, edits: EditStats, progress: ProgressStats) -> Self {
        Self {
            run,
            edits,
            progress,
        }
    }

    pub fn table(&self, kind: TableKind) -> ReportTable {
        let rows = match kind {
            TableKind::EditorTracking => edit_rows(&self.edits.editors),
            TableKind::TeamEditTracking => edit_rows(&self.edits.teams),
            TableKind::TeamTracking => self
                .progress
                .team_time
                .iter()
                .map(|(team, t)| {
                    vec![
                        Cell::Text(team.to_string()),
                        Cell::Float(t.sum_map_hrs),
                        Cell::Float(t.sum_qa_hrs),
                        Cell::Float(t.sum_finalize_hrs),
                        Cell::Float(t.sum_total_hrs),
                    ]
                })
                .collect(),
            TableKind::ProjectTracking => self
                .progress
                .project
                .iter()
                .map(|(team, p)| {
                    vec![
                        Cell::Text(team.to_string()),
                        Cell::Int(p.total_units as i64),
                        Cell::Int(p.not_started as i64),
                        Cell::Int(p.mapping_in_progress as i64),
                        Cell::Int(p.mapped as i64),
                        Cell::Int(p.qa_in_progress as i64),
                        Cell::Int(p.qa_done as i64),
                        Cell::Int(p.finalize_in_progress as i64),
                        Cell::Int(p.finalized as i64),
                        Cell::Float(p.mean_map_hrs),
                        Cell::Float(p.mean_qa_hrs),
                        Cell::Float(p.mean_finalize_hrs),
                        Cell::Float(p.mean_total_hrs),
                    ]
                })
                .collect(),
        };
        ReportTable { kind, rows }
    }

    pub fn tables(&self) -> Vec<ReportTable> {
        TableKind::all().iter().map(|k| self.table(*k)).collect()
    }
}
