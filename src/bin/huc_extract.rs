//! HUC Extract Binary - Per-Unit Polygon Statistics
//!
//! Sums the clipped mapping polygons of each selected unit and writes
//! POLY_CT, POLY_AREA_ACRES and POLY_LENGTH_KM onto the unit rows.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin huc_extract -- <unit db> <unit table> <clip export .csv> [--units 12,15]
//! ```
//!
//! The clip export holds one row per clipped part (OBJECTID of the unit,
//! SHAPE_AREA in m², SHAPE_LENGTH in m). Without `--units` every unit present
//! in the export is processed.
//!
//! ## Environment Variables
//!
//! - RUST_LOG - Logging level (optional, default: info)

use projtrack::config::positional_args;
use projtrack::huc_extract::{extract_units, parse_units_from_args, ClipSource, CsvClipSource, SqliteUnitStore};
use projtrack::tracking_core::TrackingError;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let positional = positional_args(&args, &["--units"]);
    let [unit_db, unit_table, clip_path] = positional.as_slice() else {
        log::error!("Usage: huc_extract <unit db> <unit table> <clip export .csv> [--units ids]");
        return Err("expected three positional arguments".into());
    };

    let mut store = match SqliteUnitStore::open(unit_db, unit_table.as_str()) {
        Ok(store) => store,
        Err(e) => {
            log::error!("❌ The selected feature class does not exist or lacks the unit fields. ({})", e);
            return Err(e.into());
        }
    };
    let clip = CsvClipSource::open(clip_path)?;

    let selection = match parse_units_from_args(&args)? {
        Some(units) => units,
        None => clip.unit_ids(),
    };

    match extract_units(&clip, &selection, &mut store) {
        Ok(results) => {
            log::info!("✅ Updated {} units in {}", results.len(), unit_table);
            Ok(())
        }
        Err(TrackingError::EmptySelection) => {
            log::error!("❌ HUC Layer has no selection. Select the HUCS to analyze.");
            Err(TrackingError::EmptySelection.into())
        }
        Err(e) => {
            log::error!("❌ {}", e);
            Err(e.into())
        }
    }
}
