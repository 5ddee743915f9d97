//! Column names of the checkout layer attribute table

pub const EDITOR: &str = "Editor";
pub const TEAM: &str = "TeamTMU";
pub const POLY_CT: &str = "POLY_CT";
pub const POLY_AREA_ACRES: &str = "POLY_AREA_ACRES";
pub const POLY_LENGTH_KM: &str = "POLY_LENGTH_KM";
pub const MAPPING_HRS: &str = "MAPPING_HRS";
pub const HUC12: &str = "HUC12";
pub const QA_REVIEW_HRS: &str = "QA_REVIEW_HRS";
pub const QA_REVISION_HRS: &str = "QA_REVISION_HRS";
pub const QA_TOTAL_HRS: &str = "QA_TOTAL_HRS";
pub const FINALIZATION_HRS: &str = "FINALIZATION_HRS";
pub const TOTAL_HRS: &str = "TOTAL_HRS";

/// Unit layer columns updated by the extract tool
pub const OBJECTID: &str = "OBJECTID";

/// Projection used by key discovery
pub const KEY_COLUMNS: [&str; 2] = [EDITOR, TEAM];

/// Projection used by the edit-stat pass
pub const EDIT_COLUMNS: [&str; 6] = [
    EDITOR,
    TEAM,
    POLY_CT,
    POLY_AREA_ACRES,
    POLY_LENGTH_KM,
    MAPPING_HRS,
];

/// Projection used by the workflow-progress pass
pub const PROGRESS_COLUMNS: [&str; 9] = [
    HUC12,
    TEAM,
    EDITOR,
    MAPPING_HRS,
    QA_REVIEW_HRS,
    QA_REVISION_HRS,
    QA_TOTAL_HRS,
    FINALIZATION_HRS,
    TOTAL_HRS,
];

/// Hours value the data source uses for "not yet recorded"
pub const UNSET_HOURS: f64 = 1.0;
