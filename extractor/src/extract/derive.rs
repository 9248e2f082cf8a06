//! Code derivation for tables that carry descriptions but no codes.
//!
//! Business-size breakdown tables label columns like
//! `"Food stores, small businesses"`. The base description (`"food stores"`)
//! is looked up in an earlier pass's reference fragment and the size suffix
//! maps to a code tag, giving e.g. `"47.11-SB"`.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::text::normalize_description;
use crate::models::{ColumnMapping, ReferenceFragment};

/// Lowercased description → (code, note_ref), first entry wins.
#[derive(Debug, Clone, Default)]
pub struct DescriptionIndex {
    entries: HashMap<String, (String, String)>,
}

impl DescriptionIndex {
    pub fn from_fragment(fragment: &ReferenceFragment) -> Self {
        let mut entries = HashMap::new();
        for entry in &fragment.entries {
            let key = normalize_description(&entry.time_period_description);
            if key.is_empty() {
                continue;
            }
            entries.entry(key).or_insert_with(|| {
                (entry.agg_sic_code.trim().to_string(), entry.note_ref.trim().to_string())
            });
        }
        Self { entries }
    }

    pub fn get(&self, description: &str) -> Option<(&str, &str)> {
        self.entries
            .get(&normalize_description(description))
            .map(|(code, note)| (code.as_str(), note.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `"base, parts, suffix"` into (`"base, parts"`, `"suffix"`), lowercased.
///
/// A description without commas is all base and no suffix.
pub fn split_size_suffix(description: &str) -> (String, String) {
    let parts: Vec<&str> = description.split(',').map(str::trim).collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => (rest.join(", ").to_lowercase(), last.to_lowercase()),
        _ => (description.trim().to_lowercase(), String::new()),
    }
}

/// Fill codes on description-keyed mappings from `index`.
///
/// Found: code = base code + suffix tag, note inherited from the base.
/// Not found: code left empty for the backfill stage. Returns the number of
/// mappings left without a code.
pub fn derive_codes(
    mappings: &mut [ColumnMapping],
    index: &DescriptionIndex,
    suffixes: &BTreeMap<String, String>,
) -> usize {
    let mut unresolved = 0;

    for mapping in mappings.iter_mut() {
        let (base, suffix) = split_size_suffix(&mapping.time_period_description);
        match index.get(&base) {
            Some((code, note)) if !code.is_empty() => {
                let tag = suffixes.get(&suffix).map(String::as_str).unwrap_or("");
                mapping.agg_sic_code = format!("{}{}", code, tag);
                mapping.note_ref = note.to_string();
            }
            _ => {
                debug!(
                    sheet = %mapping.sheet_name,
                    table = %mapping.table_name,
                    description = %mapping.time_period_description,
                    "no base description match"
                );
                mapping.agg_sic_code.clear();
                unresolved += 1;
            }
        }
    }

    unresolved
}
