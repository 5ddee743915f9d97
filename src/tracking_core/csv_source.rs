//! CSV-backed row source for attribute table exports

use super::error::TrackingResult;
use super::row_source::{require_columns, Row, RowSource, Value};
use std::path::{Path, PathBuf};

pub struct CsvRowSource {
    path: PathBuf,
}

impl CsvRowSource {
    pub fn open(path: impl AsRef<Path>) -> TrackingResult<Self> {
        let path = path.as_ref().to_path_buf();
        // Fail early on unreadable files rather than on the first scan
        std::fs::metadata(&path)?;
        log::info!("📥 CSV row source: {}", path.display());
        Ok(Self { path })
    }

    fn reader(&self) -> TrackingResult<csv::Reader<std::fs::File>> {
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?)
    }
}

impl RowSource for CsvRowSource {
    fn columns(&self) -> TrackingResult<Vec<String>> {
        let mut reader = self.reader()?;
        Ok(reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect())
    }

    fn scan(&self, projection: &[&str]) -> TrackingResult<Vec<Row>> {
        let columns = self.columns()?;
        require_columns(&columns, projection)?;

        let positions: Vec<usize> = projection
            .iter()
            .filter_map(|name| columns.iter().position(|c| c == name))
            .collect();

        let mut reader = self.reader()?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(Row::new(
                positions
                    .iter()
                    .map(|&i| record.get(i).map(Value::from_cell).unwrap_or(Value::Null))
                    .collect(),
            ));
        }

        log::debug!("📥 Scanned {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
