//! Row source seam
//!
//! The aggregation passes only see a schema and ordered scans over named
//! columns. Backends live in `sqlite_source` and `csv_source`; `MemoryRowSource`
//! serves callers that already hold the rows.

use super::error::{TrackingError, TrackingResult};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Key form of the value: text as-is, numbers rendered, null as None
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(r.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric form of the value; numeric text is parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|r| r.is_finite()),
        }
    }

    /// Value of a text cell (CSV exports); blank cells are null
    ///
    /// The cell text is kept as stored so keys like `007` survive. Numbers are
    /// parsed on demand by [`Value::as_f64`].
    pub fn from_cell(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Value::Null
        } else {
            Value::Text(raw.to_string())
        }
    }
}

/// One scanned row, positionally aligned with the requested projection
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, idx: usize) -> &Value {
        self.values.get(idx).unwrap_or(&Value::Null)
    }
}

/// Tabular data provider with ordered scans over named columns
pub trait RowSource {
    /// Column names of the underlying table
    fn columns(&self) -> TrackingResult<Vec<String>>;

    /// Read every row, projected to `projection` in order
    ///
    /// Implementations call [`require_columns`] first so a missing column never
    /// yields a partial scan.
    fn scan(&self, projection: &[&str]) -> TrackingResult<Vec<Row>>;

    /// Human-readable description for logging
    fn describe(&self) -> String;
}

/// Fail with `Schema` naming every projected column the source lacks
pub fn require_columns(available: &[String], projection: &[&str]) -> TrackingResult<()> {
    let missing: Vec<&str> = projection
        .iter()
        .copied()
        .filter(|wanted| !available.iter().any(|c| c == wanted))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TrackingError::schema(missing))
    }
}

/// In-memory table
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryRowSource {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a full-width row; short rows are padded with nulls
    pub fn push(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(values);
    }

    pub fn with_row(mut self, values: Vec<Value>) -> Self {
        self.push(values);
        self
    }
}

impl RowSource for MemoryRowSource {
    fn columns(&self) -> TrackingResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn scan(&self, projection: &[&str]) -> TrackingResult<Vec<Row>> {
        require_columns(&self.columns, projection)?;

        let positions: Vec<usize> = projection
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| c == name))
            .collect();

        Ok(self
            .rows
            .iter()
            .map(|values| Row::new(positions.iter().map(|&i| values[i].clone()).collect()))
            .collect())
    }

    fn describe(&self) -> String {
        format!("in-memory table ({} rows)", self.rows.len())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_values_keep_stored_text() {
        assert_eq!(Value::from_cell(""), Value::Null);
        assert_eq!(Value::from_cell("  "), Value::Null);
        assert_eq!(Value::from_cell("007").as_key(), Some("007".to_string()));
        assert_eq!(Value::from_cell("1.50").as_key(), Some("1.50".to_string()));
        assert_eq!(Value::from_cell("007").as_f64(), Some(7.0));
        assert_eq!(Value::from_cell("2.5").as_f64(), Some(2.5));
        assert_eq!(Value::from_cell("nan").as_f64(), None);
        assert_eq!(Value::from_cell("Team A"), Value::Text("Team A".to_string()));
    }

    #[test]
    fn test_numeric_text_parses() {
        assert_eq!(Value::Text(" 3.5 ".into()).as_f64(), Some(3.5));
        assert_eq!(Value::Text("abc".into()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
        assert_eq!(Value::Integer(4).as_key(), Some("4".to_string()));
    }

    #[test]
    fn test_memory_scan_projects_in_order() {
        let source = MemoryRowSource::new(["a", "b", "c"])
            .with_row(vec![1i64.into(), "x".into(), 2.5.into()]);

        let rows = source.scan(&["c", "a"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), &Value::Real(2.5));
        assert_eq!(rows[0].get(1), &Value::Integer(1));
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let source = MemoryRowSource::new(["Editor"]);
        match source.scan(&["Editor", "TeamTMU", "POLY_CT"]) {
            Err(TrackingError::Schema { missing }) => {
                assert_eq!(missing, vec!["TeamTMU".to_string(), "POLY_CT".to_string()]);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_padded() {
        let mut source = MemoryRowSource::new(["a", "b"]);
        source.push(vec![Value::Integer(1)]);
        let rows = source.scan(&["b"]).unwrap();
        assert!(rows[0].get(0).is_null());
    }
}
