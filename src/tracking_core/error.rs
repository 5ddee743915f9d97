//! Error taxonomy shared by the tracking tools
//!
//! Every stage converts what it receives from the stage below into one of these
//! variants, logs a user-facing message and returns early.

use std::path::PathBuf;

use super::report::TableKind;

#[derive(Debug)]
pub enum TrackingError {
    /// Required columns are absent from the row source schema
    Schema { missing: Vec<String> },
    /// No units selected for the extract tool
    EmptySelection,
    /// Credential or session rejected by the portal
    RemoteAuth(String),
    /// Item, service or folder already exists on the portal
    RemoteConflict(String),
    /// Expected hosted service or table is missing
    RemoteNotFound(String),
    /// Any other portal failure
    Remote(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Database(rusqlite::Error),
    Config(String),
}

impl TrackingError {
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TrackingError::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// True for failures raised by the portal rather than local I/O
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            TrackingError::RemoteAuth(_)
                | TrackingError::RemoteConflict(_)
                | TrackingError::RemoteNotFound(_)
                | TrackingError::Remote(_)
        )
    }
}

impl From<std::io::Error> for TrackingError {
    fn from(err: std::io::Error) -> Self {
        TrackingError::Io(err)
    }
}

impl From<csv::Error> for TrackingError {
    fn from(err: csv::Error) -> Self {
        TrackingError::Csv(err)
    }
}

impl From<rusqlite::Error> for TrackingError {
    fn from(err: rusqlite::Error) -> Self {
        TrackingError::Database(err)
    }
}

impl From<reqwest::Error> for TrackingError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16() == 401 || s.as_u16() == 403).unwrap_or(false) {
            TrackingError::RemoteAuth(err.to_string())
        } else {
            TrackingError::Remote(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::Remote(format!("Malformed portal response: {}", err))
    }
}

impl std::fmt::Display for TrackingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingError::Schema { missing } => {
                write!(f, "Missing required fields: {}", missing.join(", "))
            }
            TrackingError::EmptySelection => write!(f, "No units selected"),
            TrackingError::RemoteAuth(e) => write!(f, "Portal authentication failed: {}", e),
            TrackingError::RemoteConflict(e) => write!(f, "Portal item already exists: {}", e),
            TrackingError::RemoteNotFound(e) => write!(f, "Portal item not found: {}", e),
            TrackingError::Remote(e) => write!(f, "Portal error: {}", e),
            TrackingError::Io(e) => write!(f, "IO error: {}", e),
            TrackingError::Csv(e) => write!(f, "CSV error: {}", e),
            TrackingError::Database(e) => write!(f, "Database error: {}", e),
            TrackingError::Config(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for TrackingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackingError::Io(e) => Some(e),
            TrackingError::Csv(e) => Some(e),
            TrackingError::Database(e) => Some(e),
            _ => None,
        }
    }
}

/// A failure tied to one of the four artifacts
#[derive(Debug)]
pub struct ArtifactError {
    pub kind: TableKind,
    pub path: PathBuf,
    pub source: TrackingError,
}

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind.file_stem(),
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

pub type TrackingResult<T> = Result<T, TrackingError>;
