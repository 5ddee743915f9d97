//! Key discovery over the checkout layer

use super::error::TrackingResult;
use super::fields::KEY_COLUMNS;
use super::row_source::RowSource;

/// Distinct editors (trimmed) and teams, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySets {
    pub editors: Vec<String>,
    pub teams: Vec<String>,
}

impl KeySets {
    /// Project name derived from the data: the first team, trimmed
    pub fn project_name(&self) -> Option<String> {
        self.teams
            .first()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Scan `Editor`/`TeamTMU` once and collect the distinct non-null keys
pub fn discover_keys(source: &dyn RowSource) -> TrackingResult<KeySets> {
    let rows = source.scan(&KEY_COLUMNS)?;

    let mut keys = KeySets::default();
    for row in &rows {
        if let Some(editor) = row.get(0).as_key() {
            let editor = editor.trim().to_string();
            if !keys.editors.contains(&editor) {
                keys.editors.push(editor);
            }
        }
        if let Some(team) = row.get(1).as_key() {
            if !keys.teams.contains(&team) {
                keys.teams.push(team);
            }
        }
    }

    log::info!(
        "🔑 Discovered {} editors and {} teams from {} rows",
        keys.editors.len(),
        keys.teams.len(),
        rows.len()
    );
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking_core::error::TrackingError;
    use crate::tracking_core::row_source::{MemoryRowSource, Value};

    #[test]
    fn test_editors_trimmed_teams_not() {
        let source = MemoryRowSource::new(["Editor", "TeamTMU"])
            .with_row(vec![" Alice ".into(), "T1 ".into()])
            .with_row(vec!["Alice".into(), "T1".into()])
            .with_row(vec![Value::Null, "T2".into()])
            .with_row(vec!["Bob".into(), Value::Null]);

        let keys = discover_keys(&source).unwrap();
        assert_eq!(keys.editors, vec!["Alice", "Bob"]);
        assert_eq!(keys.teams, vec!["T1 ", "T1", "T2"]);
        assert_eq!(keys.project_name(), Some("T1".to_string()));
    }

    #[test]
    fn test_missing_team_column() {
        let source = MemoryRowSource::new(["Editor"]);
        let err = discover_keys(&source).unwrap_err();
        assert!(matches!(err, TrackingError::Schema { ref missing } if missing == &vec!["TeamTMU".to_string()]));
    }

    #[test]
    fn test_empty_source() {
        let source = MemoryRowSource::new(["Editor", "TeamTMU"]);
        let keys = discover_keys(&source).unwrap();
        assert!(keys.editors.is_empty());
        assert_eq!(keys.project_name(), None);
    }
}
