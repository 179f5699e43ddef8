// SPDX-License-Identifier: MIT

//! Occurrence loading: remote document store first, local monthly JSON
//! files as fallback.
//!
//! The two sources are never merged record-by-record; the fallback only
//! runs when the remote store errors or returns nothing. Recorded
//! abatement statuses are overlaid afterwards so fallback data still
//! reflects staff actions.

use crate::db::FirestoreDb;
use crate::models::occurrence::{apply_status_overlay, normalize};
use crate::models::{Occurrence, RawOccurrence};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixed fallback file order, most recent month first.
const MONTHLY_FILES: &[(&str, &str, i32)] = &[
    ("dezembro-2025.json", "Dezembro", 2025),
    ("novembro-2025.json", "Novembro", 2025),
    ("outubro-2025.json", "Outubro", 2025),
    ("setembro-2025.json", "Setembro", 2025),
    ("agosto-2025.json", "Agosto", 2025),
    ("julho-2025.json", "Julho", 2025),
    ("junho-2025.json", "Junho", 2025),
    ("maio-2025.json", "Maio", 2025),
    ("abril-2025.json", "Abril", 2025),
    ("marco-2025.json", "Março", 2025),
    ("fevereiro-2025.json", "Fevereiro", 2025),
    ("janeiro-2025.json", "Janeiro", 2025),
];

/// Month used when a remote record carries no grouping.
const DEFAULT_MONTH: &str = "Geral";
const DEFAULT_YEAR: i32 = 2025;

/// Calendar position of a Portuguese month name (Janeiro = 1).
pub fn month_number(name: &str) -> Option<u32> {
    let n = match name {
        "Janeiro" => 1,
        "Fevereiro" => 2,
        "Março" => 3,
        "Abril" => 4,
        "Maio" => 5,
        "Junho" => 6,
        "Julho" => 7,
        "Agosto" => 8,
        "Setembro" => 9,
        "Outubro" => 10,
        "Novembro" => 11,
        "Dezembro" => 12,
        _ => return None,
    };
    Some(n)
}

/// One loaded monthly batch.
#[derive(Debug, Clone)]
pub struct MonthlyBatch {
    pub month: String,
    pub year: i32,
    pub data: Vec<Occurrence>,
}

/// A (month, year) grouping available for filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grouping {
    pub month: String,
    pub year: i32,
}

/// Loads and reconciles occurrence data.
#[derive(Clone)]
pub struct OccurrenceService {
    db: FirestoreDb,
    data_dir: PathBuf,
}

impl OccurrenceService {
    pub fn new(db: FirestoreDb, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            data_dir: data_dir.into(),
        }
    }

    /// Load all batches: remote store first, fallback files otherwise.
    pub async fn load_monthly(&self) -> Vec<MonthlyBatch> {
        match self.db.get_all_occurrences().await {
            Ok(records) if !records.is_empty() => {
                tracing::debug!(count = records.len(), "Loaded occurrences from Firestore");
                return group_by_month(records);
            }
            Ok(_) => {
                tracing::info!("Firestore returned no occurrences, using local fallback");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Firestore unavailable, using local fallback");
            }
        }

        let mut batches = self.load_fallback_files().await;
        self.overlay_recorded_statuses(&mut batches).await;
        batches
    }

    /// All occurrences as a flat list.
    pub async fn load_all(&self) -> Vec<Occurrence> {
        self.load_monthly()
            .await
            .into_iter()
            .flat_map(|b| b.data)
            .collect()
    }

    /// Occurrences for one month/year grouping.
    pub async fn month_data(&self, month: &str, year: i32) -> Vec<Occurrence> {
        if let Ok(records) = self.db.get_occurrences_by_month(month, year).await {
            if !records.is_empty() {
                return records;
            }
        }

        self.load_monthly()
            .await
            .into_iter()
            .find(|b| b.month == month && b.year == year)
            .map(|b| b.data)
            .unwrap_or_default()
    }

    /// Groupings present in the loaded data, most recent first.
    pub async fn available_groupings(&self) -> Vec<Grouping> {
        let mut groupings: Vec<Grouping> = self
            .load_monthly()
            .await
            .into_iter()
            .map(|b| Grouping {
                month: b.month,
                year: b.year,
            })
            .collect();
        sort_groupings(&mut groupings);
        groupings
    }

    async fn load_fallback_files(&self) -> Vec<MonthlyBatch> {
        let mut batches = Vec::new();

        for &(file, month, year) in MONTHLY_FILES {
            let path = self.data_dir.join(file);
            match load_batch_file(&path, month, year).await {
                Ok(Some(batch)) => batches.push(batch),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(file, error = %e, "Skipping unreadable fallback file");
                }
            }
        }

        batches
    }

    /// Reconcile recorded abatement actions onto fallback-loaded batches.
    /// A failed status read only loses the overlay, never the data.
    async fn overlay_recorded_statuses(&self, batches: &mut Vec<MonthlyBatch>) {
        let statuses = match self.db.list_abatement_statuses().await {
            Ok(statuses) => statuses,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load abatement statuses for overlay");
                return;
            }
        };
        if statuses.is_empty() {
            return;
        }

        for batch in batches.iter_mut() {
            batch.data = apply_status_overlay(std::mem::take(&mut batch.data), &statuses);
        }
    }
}

/// Parse and normalize one fallback file. Missing files are not an error.
async fn load_batch_file(
    path: &Path,
    month: &str,
    year: i32,
) -> anyhow::Result<Option<MonthlyBatch>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let rows: Vec<RawOccurrence> = serde_json::from_slice(&bytes)?;
    if rows.is_empty() {
        return Ok(None);
    }

    let data: Vec<Occurrence> = rows
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let mut occ = normalize(raw, index);
            occ.month = Some(month.to_string());
            occ.year = Some(year);
            occ
        })
        .collect();

    Ok(Some(MonthlyBatch {
        month: month.to_string(),
        year,
        data,
    }))
}

/// Group remote records into monthly batches, defaulting untagged records.
fn group_by_month(records: Vec<Occurrence>) -> Vec<MonthlyBatch> {
    let mut grouped: BTreeMap<(i32, String), Vec<Occurrence>> = BTreeMap::new();

    for record in records {
        let month = record
            .month
            .clone()
            .unwrap_or_else(|| DEFAULT_MONTH.to_string());
        let year = record.year.unwrap_or(DEFAULT_YEAR);
        grouped.entry((year, month)).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|((year, month), data)| MonthlyBatch { month, year, data })
        .collect()
}

/// Sort year descending, then calendar month descending. Unknown month
/// names sort last within their year.
pub fn sort_groupings(groupings: &mut [Grouping]) {
    groupings.sort_by(|a, b| {
        b.year.cmp(&a.year).then_with(|| {
            month_number(&b.month)
                .unwrap_or(0)
                .cmp(&month_number(&a.month).unwrap_or(0))
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouping(month: &str, year: i32) -> Grouping {
        Grouping {
            month: month.to_string(),
            year,
        }
    }

    #[test]
    fn test_sort_groupings_calendar_not_lexicographic() {
        // Lexicographically Janeiro > Fevereiro; calendar order must win
        let mut groupings = vec![
            grouping("Janeiro", 2025),
            grouping("Março", 2025),
            grouping("Fevereiro", 2025),
        ];
        sort_groupings(&mut groupings);

        assert_eq!(groupings[0], grouping("Março", 2025));
        assert_eq!(groupings[1], grouping("Fevereiro", 2025));
        assert_eq!(groupings[2], grouping("Janeiro", 2025));
    }

    #[test]
    fn test_sort_groupings_year_takes_precedence() {
        let mut groupings = vec![grouping("Dezembro", 2024), grouping("Janeiro", 2025)];
        sort_groupings(&mut groupings);

        assert_eq!(groupings[0], grouping("Janeiro", 2025));
        assert_eq!(groupings[1], grouping("Dezembro", 2024));
    }

    #[test]
    fn test_month_number_full_year() {
        assert_eq!(month_number("Janeiro"), Some(1));
        assert_eq!(month_number("Dezembro"), Some(12));
        assert_eq!(month_number("NotAMonth"), None);
    }

    #[tokio::test]
    async fn test_fallback_load_normalizes_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("janeiro-2025.json"),
            r#"[
                {"NOME": "João Silva", "CAT": "Sub-17", "DATA": 45658,
                 "TIPO": "Atraso", "OCORRÊNCIA": "Atraso no café", "VALOR": 10.0},
                {"NOME": "Ana Souza", "CAT": "Sub-15", "DATA": "02/01/25",
                 "TIPO": "Falta", "OCORRÊNCIA": "Faltou ao estudo", "VALOR": 20.0}
            ]"#,
        )
        .unwrap();

        let service = OccurrenceService::new(FirestoreDb::new_mock(), dir.path());
        let batches = service.load_monthly().await;

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.month, "Janeiro");
        assert_eq!(batch.year, 2025);
        assert_eq!(batch.data.len(), 2);
        assert_eq!(batch.data[0].month.as_deref(), Some("Janeiro"));
        assert!(batch.data[0].id.starts_with("occ_"));
        assert!(batch.data[0].date > 0);
    }

    #[tokio::test]
    async fn test_fallback_with_no_files_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let service = OccurrenceService::new(FirestoreDb::new_mock(), dir.path());

        assert!(service.load_all().await.is_empty());
        assert!(service.available_groupings().await.is_empty());
    }

    #[tokio::test]
    async fn test_groupings_from_fallback_sorted_descending() {
        let dir = tempfile::tempdir().unwrap();
        let row = r#"[{"NOME": "Ana", "DATA": 45658, "TIPO": "Atraso", "VALOR": 1.0}]"#;
        std::fs::write(dir.path().join("janeiro-2025.json"), row).unwrap();
        std::fs::write(dir.path().join("marco-2025.json"), row).unwrap();

        let service = OccurrenceService::new(FirestoreDb::new_mock(), dir.path());
        let groupings = service.available_groupings().await;

        assert_eq!(groupings[0], grouping("Março", 2025));
        assert_eq!(groupings[1], grouping("Janeiro", 2025));
    }
}
