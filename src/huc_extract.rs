//! Per-unit polygon statistics
//!
//! Clipping the mapped polygons to each selected unit happens upstream; this
//! module takes the clipped parts, sums them per unit and writes
//! `POLY_CT`, `POLY_AREA_ACRES` and `POLY_LENGTH_KM` back onto the unit rows.

use crate::tracking_core::fields::{OBJECTID, POLY_AREA_ACRES, POLY_CT, POLY_LENGTH_KM};
use crate::tracking_core::records::round2;
use crate::tracking_core::row_source::require_columns;
use crate::tracking_core::{CsvRowSource, RowSource, TrackingError, TrackingResult};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

pub const SQ_METERS_PER_ACRE: f64 = 4046.85642;
pub const METERS_PER_KM: f64 = 1000.0;

pub const SHAPE_AREA: &str = "SHAPE_AREA";
pub const SHAPE_LENGTH: &str = "SHAPE_LENGTH";

/// One clipped polygon part, in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPart {
    pub area_m2: f64,
    pub length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitMeasures {
    pub poly_ct: i64,
    pub acres: f64,
    pub km: f64,
}

impl UnitMeasures {
    pub fn from_parts(parts: &[ClipPart]) -> Self {
        let area: f64 = parts.iter().map(|p| p.area_m2).sum();
        let length: f64 = parts.iter().map(|p| p.length_m).sum();
        Self {
            poly_ct: parts.len() as i64,
            acres: round2(area / SQ_METERS_PER_ACRE),
            km: round2(length / METERS_PER_KM),
        }
    }
}

/// Clipped parts grouped by unit OBJECTID
pub trait ClipSource {
    /// Units present in the clip output, in first-seen order
    fn unit_ids(&self) -> Vec<i64>;

    fn parts(&self, unit: i64) -> &[ClipPart];
}

/// Where computed measures are written
pub trait UnitStore {
    /// Update one unit row; false when no row has that OBJECTID
    fn update_unit(&mut self, object_id: i64, measures: &UnitMeasures) -> TrackingResult<bool>;
}

/// Clip output exported as a table with OBJECTID, SHAPE_AREA and SHAPE_LENGTH
#[derive(Debug, Default)]
pub struct CsvClipSource {
    order: Vec<i64>,
    parts: HashMap<i64, Vec<ClipPart>>,
}

impl CsvClipSource {
    pub fn open(path: impl AsRef<Path>) -> TrackingResult<Self> {
        Self::from_source(&CsvRowSource::open(path)?)
    }

    pub fn from_source(source: &dyn RowSource) -> TrackingResult<Self> {
        let mut clip = CsvClipSource::default();

        for row in source.scan(&[OBJECTID, SHAPE_AREA, SHAPE_LENGTH])? {
            let Some(id) = row.get(0).as_f64().map(|v| v as i64) else {
                log::debug!("Skipping clip part without {}", OBJECTID);
                continue;
            };
            let part = ClipPart {
                area_m2: row.get(1).as_f64().unwrap_or(0.0),
                length_m: row.get(2).as_f64().unwrap_or(0.0),
            };
            if !clip.parts.contains_key(&id) {
                clip.order.push(id);
            }
            clip.parts.entry(id).or_default().push(part);
        }

        log::info!(
            "✂️  Loaded clip parts for {} units from {}",
            clip.order.len(),
            source.describe()
        );
        Ok(clip)
    }
}

impl ClipSource for CsvClipSource {
    fn unit_ids(&self) -> Vec<i64> {
        self.order.clone()
    }

    fn parts(&self, unit: i64) -> &[ClipPart] {
        self.parts.get(&unit).map(|p| p.as_slice()).unwrap_or(&[])
    }
}

/// Unit attribute table in a SQLite/GeoPackage file
pub struct SqliteUnitStore {
    conn: Connection,
    table: String,
}

impl SqliteUnitStore {
    pub fn open(db_path: impl AsRef<Path>, table: impl Into<String>) -> TrackingResult<Self> {
        let db_path = db_path.as_ref();
        if !db_path.exists() {
            return Err(TrackingError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Unit table not found: {}", db_path.display()),
            )));
        }

        let conn = Connection::open(db_path)?;
        let table = table.into();

        let columns = {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\"")))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<Result<Vec<_>, _>>()?;
            names
        };
        require_columns(&columns, &[OBJECTID, POLY_CT, POLY_AREA_ACRES, POLY_LENGTH_KM])?;

        Ok(Self { conn, table })
    }
}

impl UnitStore for SqliteUnitStore {
    fn update_unit(&mut self, object_id: i64, measures: &UnitMeasures) -> TrackingResult<bool> {
        let sql = format!(
            "UPDATE \"{}\" SET \"{}\" = ?1, \"{}\" = ?2, \"{}\" = ?3 WHERE \"{}\" = ?4",
            self.table.replace('"', "\"\""),
            POLY_CT,
            POLY_AREA_ACRES,
            POLY_LENGTH_KM,
            OBJECTID
        );
        let changed = self.conn.execute(
            &sql,
            params![measures.poly_ct, measures.acres, measures.km, object_id],
        )?;
        Ok(changed > 0)
    }
}

/// Compute and store measures for every selected unit
///
/// A selected unit with no clipped parts is written with zeros.
pub fn extract_units(
    clip: &dyn ClipSource,
    selection: &[i64],
    store: &mut dyn UnitStore,
) -> TrackingResult<Vec<(i64, UnitMeasures)>> {
    if selection.is_empty() {
        return Err(TrackingError::EmptySelection);
    }

    let mut results = Vec::with_capacity(selection.len());
    for &unit in selection {
        let measures = UnitMeasures::from_parts(clip.parts(unit));
        log::info!("\"{}\" = {}", OBJECTID, unit);
        log::info!("Count: {}", measures.poly_ct);
        log::info!("Total Area (acres): {}", measures.acres);
        log::info!("Total Length (km): {}", measures.km);

        if !store.update_unit(unit, &measures)? {
            log::warn!("⚠️  No unit row with {} = {}", OBJECTID, unit);
        }
        results.push((unit, measures));
    }

    Ok(results)
}

/// Parse `--units 1,2,3` from the process arguments
pub fn parse_units_from_args(args: &[String]) -> TrackingResult<Option<Vec<i64>>> {
    let Some(idx) = args.iter().position(|x| x == "--units") else {
        return Ok(None);
    };
    let raw = args
        .get(idx + 1)
        .ok_or_else(|| TrackingError::Config("--units needs a comma-separated id list".to_string()))?;

    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| TrackingError::Config(format!("Invalid unit id '{}'", s)))
        })
        .collect::<TrackingResult<Vec<_>>>()
        .map(Some)
}
