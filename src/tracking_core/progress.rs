//! Workflow progress per team
//!
//! Stage predicates are independent of each other: one unit can count toward
//! several stages. Hours equal to exactly 1 mean "not yet recorded" in the
//! source data, so the comparisons below are `== 1` and `> 1`, never a range.

use super::error::TrackingResult;
use super::fields::{PROGRESS_COLUMNS, UNSET_HOURS};
use super::keys::KeySets;
use super::records::{guarded_ratio, KeyedTable, ProjectProgressRecord, TeamProgressRecord};
use super::row_source::{Row, RowSource};

/// Per-team hour sums and stage counts
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub team_time: KeyedTable<TeamProgressRecord>,
    pub project: KeyedTable<ProjectProgressRecord>,
}

struct ProgressSample {
    unit_present: bool,
    team: Option<String>,
    editor_present: bool,
    map_hrs: Option<f64>,
    qa_review: Option<f64>,
    qa_revision: Option<f64>,
    qa_total: Option<f64>,
    finalization: Option<f64>,
    total: Option<f64>,
}

impl ProgressSample {
    fn from_row(row: &Row) -> Self {
        Self {
            unit_present: !row.get(0).is_null(),
            team: row.get(1).as_key(),
            editor_present: !row.get(2).is_null(),
            map_hrs: row.get(3).as_f64(),
            qa_review: presence(row, 4),
            qa_revision: presence(row, 5),
            qa_total: row.get(6).as_f64(),
            finalization: presence(row, 7),
            total: row.get(8).as_f64(),
        }
    }

    fn map_unset(&self) -> bool {
        self.map_hrs == Some(UNSET_HOURS)
    }

    fn mapped(&self) -> bool {
        self.map_hrs.map(|h| h > UNSET_HOURS).unwrap_or(false)
    }
}

/// Non-null cells count as present even when they are not numeric
fn presence(row: &Row, idx: usize) -> Option<f64> {
    let value = row.get(idx);
    if value.is_null() {
        None
    } else {
        Some(value.as_f64().unwrap_or(0.0))
    }
}

fn classify(sample: &ProgressSample, time: &mut TeamProgressRecord, counts: &mut ProjectProgressRecord) {
    if sample.unit_present {
        counts.total_units += 1;
    }

    if !sample.editor_present && sample.map_unset() {
        counts.not_started += 1;
    }

    if sample.editor_present && sample.map_unset() {
        counts.mapping_in_progress += 1;
    }

    if sample.mapped() {
        counts.mapped += 1;
        time.sum_map_hrs += sample.map_hrs.unwrap_or(0.0);
    }

    if sample.mapped() && (sample.qa_review.is_none() || sample.qa_revision.is_none()) {
        counts.qa_in_progress += 1;
    }

    if sample.qa_review.is_some() && sample.qa_revision.is_some() {
        counts.qa_done += 1;
        time.sum_qa_hrs += sample.qa_total.unwrap_or(0.0);
    }

    if sample.qa_revision.is_some() && sample.finalization.is_none() {
        counts.finalize_in_progress += 1;
    }

    if let Some(final_hrs) = sample.finalization {
        counts.finalized += 1;
        time.sum_finalize_hrs += final_hrs;
        time.sum_total_hrs += sample.total.unwrap_or(0.0);
    }
}

impl ProjectProgressRecord {
    /// Mean stage times; each stays zero when its count is zero
    pub fn finalize_means(&mut self, time: &TeamProgressRecord) {
        self.mean_map_hrs = guarded_ratio(time.sum_map_hrs, self.mapped as f64, 0.0);
        self.mean_qa_hrs = guarded_ratio(time.sum_qa_hrs, self.qa_done as f64, 0.0);
        self.mean_finalize_hrs = guarded_ratio(time.sum_finalize_hrs, self.finalized as f64, 0.0);
        self.mean_total_hrs = guarded_ratio(time.sum_total_hrs, self.finalized as f64, 0.0);
    }
}

/// Run the workflow-progress pass over `source` for the discovered teams
pub fn aggregate_progress(source: &dyn RowSource, keys: &KeySets) -> TrackingResult<ProgressStats> {
    let rows = source.scan(&PROGRESS_COLUMNS)?;

    let mut stats = ProgressStats {
        team_time: KeyedTable::from_keys(&keys.teams),
        project: KeyedTable::from_keys(&keys.teams),
    };

    let mut skipped = 0usize;
    for row in &rows {
        let sample = ProgressSample::from_row(row);
        let Some(team) = sample.team.as_deref() else {
            skipped += 1;
            continue;
        };

        match (stats.team_time.get_mut(team), stats.project.get_mut(team)) {
            (Some(time), Some(counts)) => classify(&sample, time, counts),
            _ => {
                log::debug!("Skipping progress row for unknown team {:?}", team);
                skipped += 1;
            }
        }
    }

    for team in keys.teams.iter() {
        let time = stats.team_time.get(team).cloned().unwrap_or_default();
        if let Some(counts) = stats.project.get_mut(team) {
            counts.finalize_means(&time);
        }
    }

    log::info!(
        "📊 Progress: {} rows over {} teams ({} rows skipped)",
        rows.len(),
        stats.project.len(),
        skipped
    );
    Ok(stats)
}
