//! Editor and team editing statistics
//!
//! One pass sums polygon count, length, area and mapping hours per editor and
//! per team. Rates are derived afterwards, once, from the final sums.

use super::error::TrackingResult;
use super::fields::{EDIT_COLUMNS, UNSET_HOURS};
use super::keys::KeySets;
use super::records::{guarded_ratio, EditRecord, KeyedTable};
use super::row_source::{Row, RowSource};

/// Per-editor and per-team edit records
#[derive(Debug, Clone, PartialEq)]
pub struct EditStats {
    pub editors: KeyedTable<EditRecord>,
    pub teams: KeyedTable<EditRecord>,
}

impl EditRecord {
    fn add_row(&mut self, sample: &EditSample) {
        self.poly_ct += sample.poly_ct;
        self.length_km += sample.length_km;
        self.area_acres += sample.area_acres;
        if let Some(hrs) = sample.map_hrs.filter(|h| *h > UNSET_HOURS) {
            self.map_hrs += hrs;
        }
    }

    /// Derive per-hour rates; left at zero until more than one hour is logged
    pub fn finalize_rates(&mut self) {
        let hrs = self.map_hrs;
        self.poly_per_hr = guarded_ratio(self.poly_ct as f64, hrs, UNSET_HOURS);
        self.acres_per_hr = guarded_ratio(self.area_acres, hrs, UNSET_HOURS);
        self.km_per_hr = guarded_ratio(self.length_km, hrs, UNSET_HOURS);
    }
}

struct EditSample {
    editor: Option<String>,
    team: Option<String>,
    poly_ct: i64,
    area_acres: f64,
    length_km: f64,
    map_hrs: Option<f64>,
}

impl EditSample {
    fn from_row(row: &Row) -> Self {
        Self {
            editor: row.get(0).as_key().map(|e| e.trim().to_string()),
            team: row.get(1).as_key(),
            // Counts are truncated toward zero
            poly_ct: row.get(2).as_f64().map(|c| c.trunc() as i64).unwrap_or(0),
            area_acres: row.get(3).as_f64().unwrap_or(0.0),
            length_km: row.get(4).as_f64().unwrap_or(0.0),
            map_hrs: row.get(5).as_f64(),
        }
    }
}

/// Run the edit-stat pass over `source` for the discovered `keys`
pub fn aggregate_edit_stats(source: &dyn RowSource, keys: &KeySets) -> TrackingResult<EditStats> {
    let rows = source.scan(&EDIT_COLUMNS)?;

    let mut stats = EditStats {
        editors: KeyedTable::from_keys(&keys.editors),
        teams: KeyedTable::from_keys(&keys.teams),
    };

    let mut skipped = 0usize;
    for row in &rows {
        let sample = EditSample::from_row(row);

        let editor = sample.editor.as_deref().and_then(|e| stats.editors.get_mut(e));
        let hit_editor = editor.is_some();
        if let Some(record) = editor {
            record.add_row(&sample);
        }

        let team = sample.team.as_deref().and_then(|t| stats.teams.get_mut(t));
        let hit_team = team.is_some();
        if let Some(record) = team {
            record.add_row(&sample);
        }

        if !hit_editor && !hit_team {
            skipped += 1;
        }
    }

    stats.editors.values_mut().for_each(EditRecord::finalize_rates);
    stats.teams.values_mut().for_each(EditRecord::finalize_rates);

    log::info!(
        "✏️  Edit stats: {} rows, {} editors, {} teams ({} rows matched no key)",
        rows.len(),
        stats.editors.len(),
        stats.teams.len(),
        skipped
    );
    Ok(stats)
}
