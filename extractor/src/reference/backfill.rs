//! Fill missing record codes from the reconciled reference table.

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::extract::text::normalize_description;
use crate::models::{DataRecord, ReferenceEntry, UnmatchedRecord};

/// Normalized description → code. First entry wins; empty codes are ignored.
#[derive(Debug, Clone, Default)]
pub struct CodeLookup {
    codes: HashMap<String, String>,
}

impl CodeLookup {
    pub fn from_entries(entries: &[ReferenceEntry]) -> Self {
        let mut codes = HashMap::new();
        for entry in entries {
            let code = entry.agg_sic_code.trim();
            if code.is_empty() {
                continue;
            }
            codes
                .entry(normalize_description(&entry.time_period_description))
                .or_insert_with(|| code.to_string());
        }
        Self { codes }
    }

    pub fn get(&self, description: &str) -> Option<&str> {
        self.codes
            .get(&normalize_description(description))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackfillOutcome {
    pub filled: usize,
    /// One row per distinct unresolved (sheet, table, dataset, description).
    pub unmatched: Vec<UnmatchedRecord>,
}

/// Fill empty codes on `records` in place.
///
/// Only records with an empty code and a non-empty description are touched.
/// Records that stay unresolved are kept and reported in the outcome.
pub fn backfill_codes(records: &mut [DataRecord], lookup: &CodeLookup) -> BackfillOutcome {
    let mut outcome = BackfillOutcome::default();
    let mut seen = HashSet::new();

    for record in records.iter_mut() {
        if record.has_code() || record.time_period_description.trim().is_empty() {
            continue;
        }
        match lookup.get(&record.time_period_description) {
            Some(code) => {
                record.agg_sic_code = code.to_string();
                outcome.filled += 1;
            }
            None => {
                let unmatched = UnmatchedRecord {
                    sheet_name: record.sheet_name.clone(),
                    table_name: record.table_name.clone(),
                    dataset_code: record.dataset_code.clone(),
                    time_period_description: record.time_period_description.clone(),
                };
                if seen.insert(unmatched.clone()) {
                    outcome.unmatched.push(unmatched);
                }
            }
        }
    }

    if !outcome.unmatched.is_empty() {
        warn!(unmatched = outcome.unmatched.len(), "descriptions without a reference code");
    }
    info!(filled = outcome.filled, "codes backfilled");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;

    fn record(desc: &str, code: &str, date: &str) -> DataRecord {
        DataRecord {
            sheet_name: "Table 3 M".into(),
            table_name: "Small and large businesses".into(),
            date: date.into(),
            value: 1.0,
            frequency: Frequency::classify(date),
            agg_sic_code: code.into(),
            dataset_code: "J4MC".into(),
            time_period_description: desc.into(),
            note_ref: String::new(),
            average_sales_2022: String::new(),
        }
    }

    #[test]
    fn test_lookup_ignores_empty_codes() {
        let lookup = CodeLookup::from_entries(&[
            ReferenceEntry::new("", "Food stores"),
            ReferenceEntry::new("47.11", " FOOD STORES"),
            ReferenceEntry::new("99", "food stores"),
        ]);
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get("food stores"), Some("47.11"));
    }

    #[test]
    fn test_backfill_match_and_unmatched() {
        let lookup = CodeLookup::from_entries(&[ReferenceEntry::new(
            "AB-NSA",
            "All businesses, not seasonally adjusted",
        )]);
        let mut records = vec![
            record("  ALL BUSINESSES, not seasonally adjusted", "", "2023 Jan"),
            record("Mystery stores", "", "2023 Jan"),
            record("Mystery stores", "", "2023 Feb"),
            record("Clothing", "47.7", "2023 Jan"),
            record("", "", "2023 Jan"),
        ];

        let outcome = backfill_codes(&mut records, &lookup);

        assert_eq!(outcome.filled, 1);
        assert_eq!(records[0].agg_sic_code, "AB-NSA");
        assert_eq!(records[1].agg_sic_code, "");
        assert_eq!(records[3].agg_sic_code, "47.7");
        assert_eq!(records.len(), 5);
        assert_eq!(
            outcome.unmatched,
            vec![UnmatchedRecord {
                sheet_name: "Table 3 M".into(),
                table_name: "Small and large businesses".into(),
                dataset_code: "J4MC".into(),
                time_period_description: "Mystery stores".into(),
            }]
        );
    }

    #[test]
    fn test_existing_code_not_overwritten() {
        let lookup = CodeLookup::from_entries(&[ReferenceEntry::new("NEW", "Clothing")]);
        let mut records = vec![record("Clothing", "OLD", "2023")];
        let outcome = backfill_codes(&mut records, &lookup);
        assert_eq!(outcome.filled, 0);
        assert_eq!(records[0].agg_sic_code, "OLD");
    }
}
