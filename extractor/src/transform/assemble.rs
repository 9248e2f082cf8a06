//! Assemble the final long-format dataset from all extracted records.
//!
//! # Architecture
//!
//! ```text
//! DataRecord (per pass + series)         →  DatasetRow
//! ┌──────────────────────────────────┐      ┌────────────────────────────────────┐
//! │ Table 1 M │ Value of retail sales│      │ Table 1 M │ VORS │ 2023 Jan │ ...  │
//! │ 2023 Jan  │ all retailing        │  →   │ year 2023 │ month 1              │
//! └──────────────────────────────────┘      │ uid Table 1 M-VORS-2023 Jan        │
//!                                           └────────────────────────────────────┘
//! ```
//!
//! Table names are replaced by short codes built from their initials; the
//! name → code catalogue is returned alongside the rows.

use chrono::Month;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::{DataRecord, Frequency};
use crate::reference::reconcile::normalize_code;

/// One row of the merged dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub sheet_name: String,
    pub table_code: String,
    pub date: String,
    pub value: f64,
    pub frequency: Frequency,
    pub agg_sic_code: String,
    pub dataset_code: String,
    pub time_period_description: String,
    pub note_ref: String,
    /// Leading four digits of the date label, empty if there are none.
    pub year: String,
    /// 1-12 for monthly labels, 0 otherwise.
    pub month: u32,
    pub uid: String,
}

/// Table name and the short code standing in for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNameEntry {
    pub table_name: String,
    pub table_code: String,
}

#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub rows: Vec<DatasetRow>,
    pub tables: Vec<TableNameEntry>,
    /// Records dropped because their table is excluded.
    pub excluded: usize,
}

/// Upper-cased first letter of every word: `"Value of retail sales"` → `"VORS"`.
pub fn table_code(table_name: &str) -> String {
    table_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Leading four-digit year of a date label.
pub fn year_of(date: &str) -> String {
    let date = date.trim();
    match date.get(..4) {
        Some(y) if y.chars().all(|c| c.is_ascii_digit()) => y.to_string(),
        _ => String::new(),
    }
}

/// Month number for monthly labels such as `"2023 Jan"` or `"1986 JAN"`.
///
/// Annual, quarterly and unparseable labels give 0.
pub fn month_of(date: &str, frequency: Frequency) -> u32 {
    if frequency != Frequency::Monthly {
        return 0;
    }
    date.split_whitespace()
        .last()
        .filter(|token| token.len() == 3)
        .and_then(|token| token.parse::<Month>().ok())
        .map(|m| m.number_from_month())
        .unwrap_or(0)
}

/// Merge `records` into dataset rows, dropping excluded tables.
pub fn assemble(records: Vec<DataRecord>, excluded_tables: &[String]) -> Assembled {
    let excluded_names: HashSet<&str> = excluded_tables.iter().map(String::as_str).collect();
    let mut codes: HashMap<String, String> = HashMap::new();
    let mut assembled = Assembled::default();

    for record in records {
        if excluded_names.contains(record.table_name.as_str()) {
            assembled.excluded += 1;
            continue;
        }

        let code = if record.table_name.is_empty() {
            String::new()
        } else {
            codes
                .entry(record.table_name.clone())
                .or_insert_with(|| {
                    let code = table_code(&record.table_name);
                    assembled.tables.push(TableNameEntry {
                        table_name: record.table_name.clone(),
                        table_code: code.clone(),
                    });
                    code
                })
                .clone()
        };

        assembled.rows.push(DatasetRow {
            uid: format!("{}-{}-{}", record.sheet_name, code, record.date),
            year: year_of(&record.date),
            month: month_of(&record.date, record.frequency),
            sheet_name: record.sheet_name,
            table_code: code,
            date: record.date,
            value: record.value,
            frequency: record.frequency,
            agg_sic_code: normalize_code(&record.agg_sic_code),
            dataset_code: record.dataset_code,
            time_period_description: record.time_period_description,
            note_ref: record.note_ref,
        });
    }

    debug!(
        rows = assembled.rows.len(),
        tables = assembled.tables.len(),
        excluded = assembled.excluded,
        "dataset assembled"
    );
    assembled
}
