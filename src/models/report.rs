// SPDX-License-Identifier: MIT

//! Paginated report document for a single athlete.
//!
//! The backend emits structure only (pages, formatted entries, totals);
//! pixel-level PDF layout belongs to the frontend.

use serde::Serialize;

/// One formatted occurrence inside a report page.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    /// Event date, `DD/MM/YYYY`
    pub date: String,
    /// Currency amount, formatted
    pub value: String,
    /// Description word-wrapped to the report column width
    pub description_lines: Vec<String>,
    /// Entry is rendered struck-through and excluded from totals
    pub abated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPage {
    /// 1-indexed page number
    pub number: u32,
    pub entries: Vec<ReportEntry>,
}

/// A complete paginated report for one athlete and period.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub athlete_name: String,
    pub category: String,
    /// "Month/Year" the report covers
    pub period: String,
    /// RFC3339 generation timestamp
    pub generated_at: String,
    pub pages: Vec<ReportPage>,
    /// Count of non-abated entries
    pub total_count: u32,
    /// Summed value of non-abated entries
    pub total_value: f64,
}
