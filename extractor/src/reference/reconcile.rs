//! Merge reference fragments into one table with a single row per code.
//!
//! Rows are normalized, then deduplicated twice in source order: first by
//! description, then by code. Every dropped row that disagrees with the kept
//! one goes to the conflict log. Manual overrides are appended afterwards if
//! their (code, description) pair is not already present.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::models::{ConflictLogRecord, ConflictType, ReferenceEntry, ReferenceFragment};

static NOTE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^note(\d+)$").expect("valid note regex"));

/// Reconciled reference table plus its audit trail.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    pub entries: Vec<ReferenceEntry>,
    /// Conflicts in detection order.
    pub conflicts: Vec<ConflictLogRecord>,
    /// Override rows appended to the table.
    pub overrides_added: usize,
}

/// Upper-case the code and drop all whitespace in it.
pub fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// `note12` / `NOTE12` become `Note 12`; anything else is kept as is.
pub fn normalize_note(note: &str) -> String {
    NOTE_REF.replace(note, "Note $1").into_owned()
}

/// Keep digits, `.` and `,` only, e.g. `"£8,500m"` → `"8,500"`.
pub fn normalize_amount(amount: &str) -> String {
    amount
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn normalize_entry(entry: &ReferenceEntry) -> ReferenceEntry {
    ReferenceEntry {
        agg_sic_code: normalize_code(&entry.agg_sic_code),
        time_period_description: entry.time_period_description.clone(),
        note_ref: normalize_note(&entry.note_ref),
        sales_in_2022_mln: normalize_amount(&entry.sales_in_2022_mln),
        percentage_weight: normalize_amount(&entry.percentage_weight),
    }
}

/// Reconcile `fragments` (in order) and then apply `overrides`.
pub fn reconcile(fragments: &[ReferenceFragment], overrides: &[ReferenceEntry]) -> Reconciliation {
    let mut conflicts = Vec::new();

    // Pass 1: one row per description
    let mut by_description: HashMap<String, String> = HashMap::new();
    let mut survivors = Vec::new();
    for fragment in fragments {
        debug!(source = %fragment.source, rows = fragment.len(), "merging reference fragment");
        for entry in fragment.entries.iter().map(normalize_entry) {
            match by_description.get(&entry.time_period_description) {
                None => {
                    by_description.insert(
                        entry.time_period_description.clone(),
                        entry.agg_sic_code.clone(),
                    );
                    survivors.push(entry);
                }
                Some(kept) if *kept != entry.agg_sic_code => {
                    conflicts.push(ConflictLogRecord {
                        conflict_type: ConflictType::Description,
                        time_period_description: entry.time_period_description.clone(),
                        kept_agg_sic_code: kept.clone(),
                        dropped_agg_sic_code: entry.agg_sic_code.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    // Pass 2: one row per code
    let mut codes = HashSet::new();
    let mut entries = Vec::with_capacity(survivors.len());
    for entry in survivors {
        if codes.insert(entry.agg_sic_code.clone()) {
            entries.push(entry);
        } else {
            conflicts.push(ConflictLogRecord {
                conflict_type: ConflictType::Code,
                time_period_description: entry.time_period_description.clone(),
                kept_agg_sic_code: entry.agg_sic_code.clone(),
                dropped_agg_sic_code: entry.agg_sic_code,
            });
        }
    }

    let overrides_added = apply_overrides(&mut entries, &codes, overrides);

    info!(
        entries = entries.len(),
        conflicts = conflicts.len(),
        overrides_added,
        "reference table reconciled"
    );

    Reconciliation {
        entries,
        conflicts,
        overrides_added,
    }
}

fn apply_overrides(
    entries: &mut Vec<ReferenceEntry>,
    codes: &HashSet<String>,
    overrides: &[ReferenceEntry],
) -> usize {
    let mut present: HashSet<(String, String)> = entries
        .iter()
        .map(|e| (e.agg_sic_code.clone(), e.time_period_description.clone()))
        .collect();

    let mut added = 0;
    for entry in overrides.iter().map(normalize_entry) {
        let key = (entry.agg_sic_code.clone(), entry.time_period_description.clone());
        if !present.insert(key) {
            continue;
        }
        if codes.contains(&entry.agg_sic_code) {
            warn!(
                code = %entry.agg_sic_code,
                description = %entry.time_period_description,
                "override reuses an existing code"
            );
        }
        entries.push(entry);
        added += 1;
    }
    added
}
