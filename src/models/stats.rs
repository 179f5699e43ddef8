// SPDX-License-Identifier: MIT

//! Occurrence aggregates for dashboard cards and reports.
//!
//! Totals always exclude records flagged as abated/removed; the flag
//! soft-excludes a record without deleting it.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::Occurrence;

/// Count and summed value over a set of occurrences.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OccurrenceTotals {
    pub count: u32,
    pub total_value: f64,
}

/// Per-athlete aggregate row for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AthleteTotals {
    pub athlete_name: String,
    pub category: String,
    pub count: u32,
    pub total_value: f64,
}

/// Aggregate count and value, excluding abated/removed records.
pub fn totals(occurrences: &[Occurrence]) -> OccurrenceTotals {
    let mut acc = OccurrenceTotals::default();
    for occ in occurrences {
        if occ.is_abated_or_removed {
            continue;
        }
        acc.count += 1;
        acc.total_value += occ.value;
    }
    acc
}

/// Per-athlete aggregates, sorted by total value descending then by name.
pub fn totals_by_athlete(occurrences: &[Occurrence]) -> Vec<AthleteTotals> {
    let mut by_athlete: HashMap<&str, AthleteTotals> = HashMap::new();

    for occ in occurrences {
        let entry = by_athlete
            .entry(occ.athlete_name.as_str())
            .or_insert_with(|| AthleteTotals {
                athlete_name: occ.athlete_name.clone(),
                category: occ.category.clone(),
                count: 0,
                total_value: 0.0,
            });
        if occ.is_abated_or_removed {
            continue;
        }
        entry.count += 1;
        entry.total_value += occ.value;
    }

    let mut rows: Vec<AthleteTotals> = by_athlete.into_values().collect();
    rows.sort_by(|a, b| {
        b.total_value
            .total_cmp(&a.total_value)
            .then_with(|| a.athlete_name.cmp(&b.athlete_name))
    });
    rows
}
