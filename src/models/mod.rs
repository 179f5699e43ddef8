// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod consent;
pub mod occurrence;
pub mod report;
pub mod stats;

pub use consent::ConsentRecord;
pub use occurrence::{AbatementStatus, Occurrence, RawOccurrence};
pub use report::ReportDocument;
pub use stats::{AthleteTotals, OccurrenceTotals};
