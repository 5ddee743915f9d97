//! SQLite mirror of the hosted tracking tables
//!
//! One table per kind, keyed the same way as the hosted tables, so repeated
//! runs upsert rather than duplicate.

use super::error::TrackingResult;
use super::report::{Cell, ColumnType, ReportTable, TableKind};
use super::writer_backend::{ReportWriterBackend, WrittenArtifact};
use async_trait::async_trait;
use rusqlite::types::ToSqlOutput;
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::{Path, PathBuf};

pub struct SqliteReportWriter {
    conn: Connection,
    db_path: PathBuf,
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Cell::Text(s) => s.to_sql(),
            Cell::Int(i) => i.to_sql(),
            Cell::Float(f) => f.to_sql(),
        }
    }
}

fn create_table_sql(kind: TableKind) -> String {
    let columns = kind
        .header()
        .iter()
        .map(|name| {
            let ty = match kind.column_type(name) {
                ColumnType::Key => "TEXT NOT NULL UNIQUE",
                ColumnType::Integer => "INTEGER NOT NULL",
                ColumnType::Double => "REAL NOT NULL",
            };
            format!("\"{}\" {}", name, ty)
        })
        .collect::<Vec<_>>()
        .join(",\n                ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {},
                updated_at INTEGER NOT NULL
            )",
        kind.file_stem(),
        columns
    )
}

fn upsert_sql(kind: TableKind) -> String {
    let header = kind.header();
    let columns = header
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=header.len() + 1)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = header
        .iter()
        .skip(1)
        .map(|c| format!("\"{0}\" = excluded.\"{0}\"", c))
        .chain(std::iter::once("updated_at = excluded.updated_at".to_string()))
        .collect::<Vec<_>>()
        .join(",\n                ");

    format!(
        "INSERT INTO {} ({}, updated_at)
         VALUES ({})
         ON CONFLICT(\"{}\") DO UPDATE SET
                {}",
        kind.file_stem(),
        columns,
        placeholders,
        kind.key_column(),
        updates
    )
}

impl SqliteReportWriter {
    pub fn new(db_path: impl AsRef<Path>) -> TrackingResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;

        for kind in TableKind::all() {
            conn.execute(&create_table_sql(kind), [])?;
        }

        log::info!("✅ SQLite tracking mirror initialized: {}", db_path.display());
        Ok(Self { conn, db_path })
    }
}

#[async_trait]
impl ReportWriterBackend for SqliteReportWriter {
    async fn write_table(&mut self, table: &ReportTable) -> TrackingResult<WrittenArtifact> {
        let now = chrono::Utc::now().timestamp();
        let sql = upsert_sql(table.kind);

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in &table.rows {
                stmt.execute(params_from_iter(
                    row.iter().cloned().chain(std::iter::once(Cell::Int(now))),
                ))?;
            }
        }
        tx.commit()?;

        log::debug!(
            "✅ Upserted {} rows into {}",
            table.rows.len(),
            table.kind.file_stem()
        );
        Ok(WrittenArtifact {
            kind: table.kind,
            path: self.db_path.clone(),
            rows: table.rows.len(),
        })
    }

    async fn flush(&mut self) -> TrackingResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE)")?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::tempdir;

    fn editor_row(name: &str, ct: i64, hrs: f64) -> Vec<Cell> {
        vec![
            Cell::Text(name.to_string()),
            Cell::Int(ct),
            Cell::Float(1.0),
            Cell::Float(2.0),
            Cell::Float(hrs),
            Cell::Float(0.0),
            Cell::Float(0.0),
            Cell::Float(0.0),
        ]
    }

    #[tokio::test]
    async fn test_upsert_by_key() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("mirror/tracking.db");
        let mut writer = SqliteReportWriter::new(&db_path).unwrap();

        let first = ReportTable {
            kind: TableKind::EditorTracking,
            rows: vec![editor_row("Alice", 3, 2.0), editor_row("Bob", 1, 0.0)],
        };
        writer.write_table(&first).await.unwrap();

        let second = ReportTable {
            kind: TableKind::EditorTracking,
            rows: vec![editor_row("Alice", 9, 4.5)],
        };
        let written = writer.write_table(&second).await.unwrap();
        writer.flush().await.unwrap();
        assert_eq!(written.rows, 1);

        let conn = Connection::open(&db_path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM Editor_Tracking", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let (ct, hrs): (i64, f64) = conn
            .query_row(
                "SELECT Poly_Ct, Map_Hrs FROM Editor_Tracking WHERE Editor = ?1",
                params!["Alice"],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(ct, 9);
        assert_eq!(hrs, 4.5);
    }

    #[tokio::test]
    async fn test_all_tables_created() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tracking.db");
        let _writer = SqliteReportWriter::new(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        for kind in TableKind::all() {
            let exists: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![kind.file_stem()],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "missing table {}", kind.file_stem());
        }
    }

    #[test]
    fn test_upsert_sql_shape() {
        let sql = upsert_sql(TableKind::TeamTracking);
        assert!(sql.contains("ON CONFLICT(\"Team\")"));
        assert!(sql.contains("?6"));
        assert!(!sql.contains("?7"));
        assert!(!sql.contains("\"Team\" = excluded"));
    }
}
