//! Reference table accumulation, reconciliation and backfill.
//!
//! ```text
//! pass fragments ──┐
//!                  ├─► reconcile ──► reconciled table ──► backfill ──► records
//! overrides ───────┘        │                                 │
//!                           └─► conflict log                  └─► unmatched log
//! ```

pub mod backfill;
pub mod reconcile;

pub use backfill::{backfill_codes, BackfillOutcome, CodeLookup};
pub use reconcile::{normalize_entry, reconcile, Reconciliation};

use std::collections::HashMap;

use crate::models::{ReferenceEntry, ReferenceFragment};

/// Ordered reference rows with a code index; the first row seen per code wins.
#[derive(Debug, Clone, Default)]
pub struct FragmentBuilder {
    entries: Vec<ReferenceEntry>,
    by_code: HashMap<String, usize>,
}

impl FragmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless its code is empty or already present.
    pub fn insert(&mut self, entry: ReferenceEntry) -> bool {
        let code = entry.agg_sic_code.trim();
        if code.is_empty() || self.by_code.contains_key(code) {
            return false;
        }
        self.by_code.insert(code.to_string(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, code: &str) -> Option<&ReferenceEntry> {
        self.by_code.get(code.trim()).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self, source: impl Into<String>) -> ReferenceFragment {
        ReferenceFragment::new(source, self.entries)
    }
}
