//! Key/value listings such as the Contents and Notes sheets.
//!
//! These sheets have a few lines of prose, then a header row naming the two
//! columns of interest, then one entry per row.

use super::text::non_blank;
use crate::error::ListingError;
use crate::models::{ListingEntry, SheetGrid};

/// Column labels for the workbook contents listing.
pub const CONTENTS_LABELS: (&str, &str) = ("worksheet number", "worksheet description");

/// Column labels for the notes listing.
pub const NOTES_LABELS: (&str, &str) = ("note number", "note text");

/// Extract the entries below the first row naming both labels.
///
/// Rows missing either value are skipped.
pub fn extract_listing(
    grid: &SheetGrid,
    key_label: &str,
    value_label: &str,
) -> Result<Vec<ListingEntry>, ListingError> {
    let find = |row: usize, label: &str| {
        grid.row(row).iter().position(|cell| {
            cell.as_deref()
                .is_some_and(|c| c.to_lowercase().contains(label))
        })
    };

    let (header_row, key_col, value_col) = (0..grid.height())
        .find_map(|r| Some((r, find(r, key_label)?, find(r, value_label)?)))
        .ok_or_else(|| ListingError::HeaderNotFound {
            sheet: grid.name.clone(),
            key_label: key_label.to_string(),
            value_label: value_label.to_string(),
        })?;

    let entries = (header_row + 1..grid.height())
        .filter_map(|r| {
            let key = non_blank(grid.cell(r, key_col))?;
            let value = non_blank(grid.cell(r, value_col))?;
            Some(ListingEntry {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect();

    Ok(entries)
}

/// Append `entry` unless the same key/value pair is already listed.
pub fn append_unique(entries: &mut Vec<ListingEntry>, entry: ListingEntry) -> bool {
    if entries.contains(&entry) {
        return false;
    }
    entries.push(entry);
    true
}
