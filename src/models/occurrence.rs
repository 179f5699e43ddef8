// SPDX-License-Identifier: MIT

//! Occurrence model and ingestion-boundary normalization.
//!
//! Source batches arrive as loosely-shaped spreadsheet exports (uppercase
//! Portuguese column names, dates as strings or spreadsheet serials, missing
//! ids). Everything is validated and defaulted here; downstream code only
//! ever sees the typed [`Occurrence`].

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Spreadsheet serial day zero (1899-12-30T00:00:00Z) in epoch millis.
const SERIAL_DAY_ZERO_MILLIS: i64 = -2_209_161_600_000;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Serials are day counts; anything past this is already epoch millis.
const MAX_PLAUSIBLE_SERIAL: f64 = 100_000.0;

/// A single logged disciplinary/behavioral event tied to an athlete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    /// Stable id (content-derived when the source supplies none)
    pub id: String,
    pub athlete_name: String,
    /// Age/housing category (e.g. "Sub-17")
    pub category: String,
    /// Event date as epoch milliseconds (UTC)
    pub date: i64,
    /// Occurrence type label
    pub kind: String,
    pub description: String,
    /// Currency amount attached to the occurrence
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Soft-exclusion flag: disregarded for aggregate totals, never deleted
    #[serde(default)]
    pub is_abated_or_removed: bool,
    /// Staff actor who last toggled the abatement flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_by: Option<String>,
    /// When the abatement flag was last toggled (epoch millis)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_at: Option<i64>,
    /// Batch grouping the record was imported under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// A raw source row before normalization. All fields optional; the
/// aliases cover the spreadsheet-export column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOccurrence {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "NOME", alias = "nome")]
    pub name: Option<String>,
    #[serde(default, alias = "CAT", alias = "Cat")]
    pub category: Option<String>,
    #[serde(default, alias = "DATA")]
    pub date: Option<RawDate>,
    #[serde(default, alias = "TIPO")]
    pub kind: Option<String>,
    #[serde(default, alias = "OCORRÊNCIA", alias = "OCORRENCIA")]
    pub description: Option<String>,
    #[serde(default, alias = "VALOR", alias = "Valor")]
    pub value: Option<f64>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_abated_or_removed: Option<bool>,
    #[serde(default)]
    pub action_by: Option<String>,
    #[serde(default)]
    pub action_at: Option<i64>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Source date: either a `DD/MM/YY[YY]` string, a spreadsheet serial, or
/// a value already in epoch millis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Text(String),
    Number(f64),
}

/// Normalize one raw row into a typed occurrence.
///
/// `index` is the row's position in its batch; it feeds the derived id so
/// identical rows within one batch stay distinct.
pub fn normalize(raw: &RawOccurrence, index: usize) -> Occurrence {
    let athlete_name = raw.name.clone().unwrap_or_default();
    let kind = raw.kind.clone().unwrap_or_default();
    let value = raw.value.unwrap_or(0.0);
    let date = raw.date.as_ref().map(coerce_date).unwrap_or(0);

    let id = raw
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| derive_id(&athlete_name, date, &kind, value, index));

    Occurrence {
        id,
        athlete_name,
        category: raw.category.clone().unwrap_or_default(),
        date,
        kind,
        description: raw.description.clone().unwrap_or_default(),
        value,
        photo_url: raw.photo_url.clone(),
        is_abated_or_removed: raw.is_abated_or_removed.unwrap_or(false),
        action_by: raw.action_by.clone(),
        action_at: raw.action_at,
        month: raw.month.clone(),
        year: raw.year,
    }
}

/// Coerce a source date into epoch millis (UTC).
fn coerce_date(raw: &RawDate) -> i64 {
    match raw {
        RawDate::Text(s) => parse_slash_date(s).unwrap_or(0),
        RawDate::Number(n) if *n < MAX_PLAUSIBLE_SERIAL => serial_to_epoch_millis(*n),
        RawDate::Number(n) => *n as i64,
    }
}

/// Convert a spreadsheet serial day count to epoch millis
/// (day zero = 1899-12-30).
pub fn serial_to_epoch_millis(serial: f64) -> i64 {
    SERIAL_DAY_ZERO_MILLIS + (serial * MILLIS_PER_DAY as f64) as i64
}

/// Parse `DD/MM/YY` or `DD/MM/YYYY` into epoch millis at UTC midnight.
/// Two-digit years are assumed to be 20xx.
pub fn parse_slash_date(s: &str) -> Option<i64> {
    let mut parts = s.trim().splitn(3, '/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let year = if year < 100 { 2000 + year } else { year };

    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
}

/// Derive a stable id from the row content and its batch position.
///
/// Content + position only, no wall-clock component, so re-importing the
/// same batch in the same order yields the same ids.
fn derive_id(name: &str, date_millis: i64, kind: &str, value: f64, index: usize) -> String {
    let name_key = name.split_whitespace().collect::<Vec<_>>().join("_");
    let kind_key = kind.split_whitespace().collect::<Vec<_>>().join("_");
    let payload = format!("{name_key}_{date_millis}_{kind_key}_{value}_{index}");

    let digest = Sha256::digest(payload.as_bytes());
    format!("occ_{}_{}", &hex::encode(digest)[..16], index)
}

/// A recorded abatement action, stored separately from the occurrence
/// documents so it can be reconciled onto fallback-loaded data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbatementStatus {
    /// Occurrence id the status applies to
    pub id: String,
    pub is_abated_or_removed: bool,
    pub action_by: String,
    /// Epoch millis
    pub action_at: i64,
}

/// Apply recorded abatement statuses onto a loaded occurrence list.
///
/// Records without a matching status pass through unchanged.
pub fn apply_status_overlay(
    mut occurrences: Vec<Occurrence>,
    statuses: &[AbatementStatus],
) -> Vec<Occurrence> {
    for occurrence in &mut occurrences {
        if let Some(status) = statuses.iter().find(|s| s.id == occurrence.id) {
            occurrence.is_abated_or_removed = status.is_abated_or_removed;
            occurrence.action_by = Some(status.action_by.clone());
            occurrence.action_at = Some(status.action_at);
        }
    }
    occurrences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, date: RawDate, kind: &str, value: f64) -> RawOccurrence {
        RawOccurrence {
            name: Some(name.to_string()),
            date: Some(date),
            kind: Some(kind.to_string()),
            value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_serial_date_excel_epoch() {
        // 45292 is 2024-01-01 by the 1899-12-30 day-zero convention
        assert_eq!(serial_to_epoch_millis(45292.0), 1_704_067_200_000);
    }

    #[test]
    fn test_normalize_serial_date() {
        let occ = normalize(&raw("Ana", RawDate::Number(45292.0), "Atraso", 50.0), 0);
        assert_eq!(occ.date, 1_704_067_200_000);
    }

    #[test]
    fn test_normalize_millis_passthrough() {
        // Values far past any plausible serial are already epoch millis
        let occ = normalize(
            &raw("Ana", RawDate::Number(1_704_067_200_000.0), "Atraso", 50.0),
            0,
        );
        assert_eq!(occ.date, 1_704_067_200_000);
    }

    #[test]
    fn test_parse_two_digit_year() {
        let millis = parse_slash_date("15/03/25").unwrap();
        let expected = Utc
            .with_ymd_and_hms(2025, 3, 15, 0, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(millis, expected);
    }

    #[test]
    fn test_parse_four_digit_year() {
        let millis = parse_slash_date("01/01/2024").unwrap();
        assert_eq!(millis, 1_704_067_200_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_slash_date("not a date").is_none());
        assert!(parse_slash_date("32/13/25").is_none());
    }

    #[test]
    fn test_derived_id_is_deterministic() {
        let row = raw("João Silva", RawDate::Number(45292.0), "Atraso", 50.0);
        let a = normalize(&row, 3);
        let b = normalize(&row, 3);
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("occ_"));
    }

    #[test]
    fn test_derived_id_distinct_per_position() {
        let row = raw("João Silva", RawDate::Number(45292.0), "Atraso", 50.0);
        let a = normalize(&row, 0);
        let b = normalize(&row, 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_supplied_id_preserved() {
        let mut row = raw("Ana", RawDate::Number(45292.0), "Atraso", 50.0);
        row.id = Some("occ_existing".to_string());
        assert_eq!(normalize(&row, 0).id, "occ_existing");
    }

    #[test]
    fn test_abatement_defaults_false() {
        let occ = normalize(&raw("Ana", RawDate::Number(45292.0), "Atraso", 50.0), 0);
        assert!(!occ.is_abated_or_removed);
        assert!(occ.action_by.is_none());
        assert!(occ.action_at.is_none());
    }

    #[test]
    fn test_deserialize_spreadsheet_columns() {
        let json = r#"{
            "NOME": "João Silva",
            "CAT": "Sub-17",
            "DATA": "05/02/25",
            "TIPO": "Atraso",
            "OCORRÊNCIA": "Chegou atrasado ao alojamento",
            "VALOR": 25.5
        }"#;
        let row: RawOccurrence = serde_json::from_str(json).unwrap();
        let occ = normalize(&row, 0);
        assert_eq!(occ.athlete_name, "João Silva");
        assert_eq!(occ.category, "Sub-17");
        assert_eq!(occ.kind, "Atraso");
        assert_eq!(occ.value, 25.5);
        assert!(occ.date > 0);
    }

    #[test]
    fn test_status_overlay_applied() {
        let occurrences = vec![
            normalize(&raw("Ana", RawDate::Number(45292.0), "Atraso", 100.0), 0),
            normalize(&raw("Bia", RawDate::Number(45292.0), "Falta", 50.0), 1),
        ];
        let statuses = vec![AbatementStatus {
            id: occurrences[0].id.clone(),
            is_abated_or_removed: true,
            action_by: "staff@clube.com.br".to_string(),
            action_at: 1_704_067_200_000,
        }];

        let merged = apply_status_overlay(occurrences, &statuses);
        assert!(merged[0].is_abated_or_removed);
        assert_eq!(merged[0].action_by.as_deref(), Some("staff@clube.com.br"));
        assert!(!merged[1].is_abated_or_removed);
    }
}
