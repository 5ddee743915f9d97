//! SQLite-backed row source
//!
//! Reads the checkout layer's attribute table from a SQLite or GeoPackage file.
//! The connection is opened in query-only mode so the tool never takes a write
//! lock on the project database.

use super::error::TrackingResult;
use super::row_source::{require_columns, Row, RowSource, Value};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub struct SqliteRowSource {
    conn: Connection,
    db_path: PathBuf,
    table: String,
}

impl SqliteRowSource {
    pub fn open(db_path: impl AsRef<Path>, table: impl Into<String>) -> TrackingResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        // Connection::open would create a missing file
        std::fs::metadata(&db_path)?;
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA query_only = ON")?;

        let table = table.into();
        log::info!("📥 SQLite row source: {} (table {})", db_path.display(), table);

        Ok(Self {
            conn,
            db_path,
            table,
        })
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_value(raw: ValueRef<'_>) -> Value {
    match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        // Geometry blobs are never projected by the tracking passes
        ValueRef::Blob(_) => Value::Null,
    }
}

impl RowSource for SqliteRowSource {
    fn columns(&self) -> TrackingResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(&self.table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn scan(&self, projection: &[&str]) -> TrackingResult<Vec<Row>> {
        require_columns(&self.columns()?, projection)?;

        let select = projection
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            select,
            quote_ident(&self.table)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let width = projection.len();
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(to_value(row.get_ref(i)?));
                }
                Ok(Row::new(values))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("📥 Scanned {} rows from {}", rows.len(), self.table);
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.db_path.display(), self.table)
    }
}
