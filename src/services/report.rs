// SPDX-License-Identifier: MIT

//! Builds paginated report documents from an athlete's occurrences.
//!
//! Pagination uses a line budget: one line for the date/value row plus
//! one per wrapped description line and a spacer, matching how the
//! frontend lays the report out. Totals exclude abated records; abated
//! entries still render, flagged.

use crate::models::report::{ReportDocument, ReportEntry, ReportPage};
use crate::models::{stats, Occurrence};
use crate::time_utils::{format_millis_ddmmyyyy, format_utc_rfc3339};
use chrono::{DateTime, Utc};

/// Content lines per page, after header/footer space.
const PAGE_LINE_BUDGET: usize = 46;
/// Description column width in characters.
const DESCRIPTION_WRAP_COLS: usize = 90;

/// Build a report for one athlete over one period.
pub fn build_athlete_report(
    athlete_name: &str,
    category: &str,
    month: &str,
    year: i32,
    occurrences: &[Occurrence],
    generated_at: DateTime<Utc>,
) -> ReportDocument {
    let totals = stats::totals(occurrences);

    let mut sorted: Vec<&Occurrence> = occurrences.iter().collect();
    sorted.sort_by_key(|o| o.date);

    let mut pages: Vec<ReportPage> = Vec::new();
    let mut current: Vec<ReportEntry> = Vec::new();
    let mut used_lines = 0usize;

    for occ in sorted {
        let entry = ReportEntry {
            date: format_millis_ddmmyyyy(occ.date),
            value: format_currency(occ.value),
            description_lines: wrap_text(&occ.description, DESCRIPTION_WRAP_COLS),
            abated: occ.is_abated_or_removed,
        };

        // date/value row + description lines + spacer
        let cost = 1 + entry.description_lines.len() + 1;

        if used_lines + cost > PAGE_LINE_BUDGET && !current.is_empty() {
            pages.push(ReportPage {
                number: pages.len() as u32 + 1,
                entries: std::mem::take(&mut current),
            });
            used_lines = 0;
        }

        used_lines += cost;
        current.push(entry);
    }

    if !current.is_empty() {
        pages.push(ReportPage {
            number: pages.len() as u32 + 1,
            entries: current,
        });
    }

    ReportDocument {
        title: "Relatório de Ocorrências".to_string(),
        athlete_name: athlete_name.to_string(),
        category: category.to_string(),
        period: format!("{}/{}", month, year),
        generated_at: format_utc_rfc3339(generated_at),
        pages,
        total_count: totals.count,
        total_value: totals.total_value,
    }
}

/// Format a currency amount in the pt-BR style used by the dashboard.
fn format_currency(value: f64) -> String {
    format!("R$ {:.2}", value).replace('.', ",")
}

/// Greedy word wrap at `width` characters. Words longer than the width
/// get a line of their own.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(date: i64, value: f64, description: &str, abated: bool) -> Occurrence {
        Occurrence {
            id: format!("occ_{date}"),
            athlete_name: "João Silva".to_string(),
            category: "Sub-17".to_string(),
            date,
            kind: "Atraso".to_string(),
            description: description.to_string(),
            value,
            photo_url: None,
            is_abated_or_removed: abated,
            action_by: None,
            action_at: None,
            month: Some("Janeiro".to_string()),
            year: Some(2025),
        }
    }

    #[test]
    fn test_totals_exclude_abated_entries_still_rendered() {
        let occurrences = vec![
            occ(1_704_067_200_000, 100.0, "Atraso no café", false),
            occ(1_704_153_600_000, 50.0, "Falta abonada", true),
        ];

        let report = build_athlete_report(
            "João Silva",
            "Sub-17",
            "Janeiro",
            2025,
            &occurrences,
            Utc::now(),
        );

        assert_eq!(report.total_count, 1);
        assert_eq!(report.total_value, 100.0);
        // Both entries render; the abated one is flagged
        let entries: Vec<_> = report.pages.iter().flat_map(|p| &p.entries).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].abated);
    }

    #[test]
    fn test_entries_sorted_by_date() {
        let occurrences = vec![
            occ(1_704_153_600_000, 1.0, "segunda", false),
            occ(1_704_067_200_000, 1.0, "primeira", false),
        ];

        let report =
            build_athlete_report("João", "Sub-17", "Janeiro", 2025, &occurrences, Utc::now());
        let entries: Vec<_> = report.pages.iter().flat_map(|p| &p.entries).collect();
        assert_eq!(entries[0].description_lines[0], "primeira");
    }

    #[test]
    fn test_pagination_splits_long_reports() {
        // Each entry costs 3 lines (1 + 1 + spacer); 20 entries exceed one page
        let occurrences: Vec<Occurrence> = (0..20)
            .map(|i| occ(1_704_067_200_000 + i, 10.0, "Ocorrência registrada", false))
            .collect();

        let report =
            build_athlete_report("João", "Sub-17", "Janeiro", 2025, &occurrences, Utc::now());

        assert!(report.pages.len() > 1);
        assert_eq!(report.pages[0].number, 1);
        assert_eq!(report.pages[1].number, 2);
        let total_entries: usize = report.pages.iter().map(|p| p.entries.len()).sum();
        assert_eq!(total_entries, 20);
    }

    #[test]
    fn test_currency_format() {
        assert_eq!(format_currency(100.0), "R$ 100,00");
        assert_eq!(format_currency(25.5), "R$ 25,50");
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("um dois tres quatro", 8);
        assert_eq!(lines, vec!["um dois", "tres", "quatro"]);

        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
