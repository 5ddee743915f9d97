//! Per-key result records
//!
//! Each record is a named struct rather than a positional array. Keys live in a
//! `KeyedTable`, whose key set is fixed when it is built from discovery results.

use std::collections::HashMap;

/// Round to two decimal places; exact halves go to the even neighbour
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Ratio rounded to two places, or 0 when the divisor does not exceed `threshold`
pub fn guarded_ratio(numerator: f64, divisor: f64, threshold: f64) -> f64 {
    if divisor > threshold {
        round2(numerator / divisor)
    } else {
        0.0
    }
}

/// Editing totals and productivity rates for one editor or one team
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRecord {
    pub poly_ct: i64,
    pub length_km: f64,
    pub area_acres: f64,
    pub map_hrs: f64,
    pub poly_per_hr: f64,
    pub acres_per_hr: f64,
    pub km_per_hr: f64,
}

/// Hours summed per team across workflow stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamProgressRecord {
    pub sum_map_hrs: f64,
    pub sum_qa_hrs: f64,
    pub sum_finalize_hrs: f64,
    pub sum_total_hrs: f64,
}

/// Workflow stage counts and mean stage times per team
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectProgressRecord {
    pub total_units: u64,
    pub not_started: u64,
    pub mapping_in_progress: u64,
    pub mapped: u64,
    pub qa_in_progress: u64,
    pub qa_done: u64,
    pub finalize_in_progress: u64,
    pub finalized: u64,
    pub mean_map_hrs: f64,
    pub mean_qa_hrs: f64,
    pub mean_finalize_hrs: f64,
    pub mean_total_hrs: f64,
}

/// Records keyed by editor or team, in key discovery order
///
/// There is no insert: lookups for keys outside the initial set return `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable<R> {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    records: Vec<R>,
}

impl<R: Default> KeyedTable<R> {
    pub fn from_keys(keys: &[String]) -> Self {
        let mut index = HashMap::with_capacity(keys.len());
        let mut ordered = Vec::with_capacity(keys.len());
        for key in keys {
            if !index.contains_key(key) {
                index.insert(key.clone(), ordered.len());
                ordered.push(key.clone());
            }
        }
        let records = ordered.iter().map(|_| R::default()).collect();
        Self {
            keys: ordered,
            index,
            records,
        }
    }
}

impl<R> KeyedTable<R> {
    pub fn get(&self, key: &str) -> Option<&R> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut R> {
        match self.index.get(key) {
            Some(&i) => self.records.get_mut(i),
            None => None,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.keys.iter().map(String::as_str).zip(self.records.iter())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut R> {
        self.records.iter_mut()
    }
}
