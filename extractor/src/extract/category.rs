//! Single-header tables keyed by a category column.
//!
//! ```text
//! Business type   | Sales     | Weight
//! Food stores     | 120.5     | 38 [c]    -> (Food stores, Sales, 120.5, "")
//!                                          -> (Food stores, Weight, None, "Confidential")
//! ```

use std::collections::BTreeMap;
use tracing::{info, warn};

use super::text::{clean_text, coerce_number, non_blank};
use crate::error::{ListingError, PipelineResult};
use crate::models::{CategoryRecord, SheetGrid};
use crate::plan::CategoryTableSpec;
use crate::workbook::Workbook;

/// Melt the table below the first row containing `key_label`.
///
/// Columns with a blank header and rows with a blank category are skipped.
/// Every present value cell becomes a record; cells that are not numeric
/// keep `value: None`. Footnotes are looked up in `note_labels` and fall
/// back to the capitalized footnote id.
pub fn extract_category_table(
    grid: &SheetGrid,
    key_label: &str,
    note_labels: &BTreeMap<String, String>,
) -> Result<Vec<CategoryRecord>, ListingError> {
    let label = key_label.to_lowercase();
    let (header_row, key_col) = (0..grid.height())
        .find_map(|r| {
            grid.row(r)
                .iter()
                .position(|c| c.as_deref().is_some_and(|c| c.to_lowercase().contains(&label)))
                .map(|col| (r, col))
        })
        .ok_or_else(|| ListingError::LabelNotFound {
            sheet: grid.name.clone(),
            label: key_label.to_string(),
        })?;

    let columns: Vec<(usize, String)> = grid
        .row(header_row)
        .iter()
        .enumerate()
        .filter(|(col, _)| *col != key_col)
        .filter_map(|(col, cell)| Some((col, non_blank(cell.as_deref())?.to_string())))
        .collect();

    let mut records = Vec::new();
    for row in header_row + 1..grid.height() {
        let Some(category) = non_blank(grid.cell(row, key_col)) else {
            continue;
        };

        for (col, column_type) in &columns {
            let Some(raw) = grid.cell(row, *col) else {
                continue;
            };
            let (cleaned, note) = clean_text(Some(raw));
            let note_ref = note_labels.get(&note).cloned().unwrap_or(note);

            records.push(CategoryRecord {
                sheet_name: grid.name.clone(),
                category: category.to_string(),
                column_type: column_type.clone(),
                value: coerce_number(&cleaned),
                note_ref,
            });
        }
    }

    Ok(records)
}

/// Melt every sheet matching `spec`, in workbook order.
///
/// A matching sheet without the key label is skipped with a warning.
pub fn run_category_table(
    workbook: &Workbook,
    spec: &CategoryTableSpec,
) -> PipelineResult<Vec<CategoryRecord>> {
    let regex = spec.sheet_regex()?;
    let mut records = Vec::new();

    for grid in workbook.sheets().iter().filter(|g| regex.is_match(&g.name)) {
        match extract_category_table(grid, &spec.key_label, &spec.note_labels) {
            Ok(rows) => records.extend(rows),
            Err(e) => warn!(table = %spec.name, error = %e, "skipping sheet"),
        }
    }

    info!(table = %spec.name, records = records.len(), "category table complete");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidential() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("C".to_string(), "Confidential".to_string());
        map
    }

    #[test]
    fn test_melts_business_type_table() {
        let grid = SheetGrid::from_strs(
            "Table 6",
            &[
                &["Number of businesses by type"],
                &["Business type", "Businesses", "Turnover (£m)", ""],
                &["Small", "4,000", "[c]", "stray"],
                &["", "1", "2"],
                &["Large [note2]", "250", "88.5 [r]"],
            ],
        );
        let records = extract_category_table(&grid, "business type", &confidential()).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].category, "Small");
        assert_eq!(records[0].column_type, "Businesses");
        // thousands separators are not numbers
        assert_eq!(records[0].value, None);
        assert_eq!(records[1].value, None);
        assert_eq!(records[1].note_ref, "Confidential");
        assert_eq!(records[2].category, "Large [note2]");
        assert_eq!(records[2].value, Some(250.0));
        assert_eq!(records[3].value, Some(88.5));
        assert_eq!(records[3].note_ref, "R");
        assert!(records.iter().all(|r| r.sheet_name == "Table 6"));
    }

    #[test]
    fn test_key_column_need_not_be_first() {
        let grid = SheetGrid::from_strs(
            "Table 6",
            &[&["Weight", "BUSINESS TYPE"], &["12", "Online"]],
        );
        let records = extract_category_table(&grid, "business type", &BTreeMap::new()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Online");
        assert_eq!(records[0].column_type, "Weight");
        assert_eq!(records[0].value, Some(12.0));
    }

    #[test]
    fn test_run_over_matching_sheets() {
        let wb = Workbook::from_sheets(vec![
            SheetGrid::from_strs("Table 6", &[&["Business type", "Count"], &["Online", "7"]]),
            SheetGrid::from_strs("Table 6 (old)", &[&["No header here"]]),
            SheetGrid::from_strs("Table 1 M", &[&["Business type", "Count"], &["Shops", "1"]]),
        ]);
        let spec = CategoryTableSpec {
            name: "table_6".into(),
            sheet_pattern: "^Table 6".into(),
            key_label: "business type".into(),
            note_labels: confidential(),
        };
        let records = run_category_table(&wb, &spec).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Online");
        assert_eq!(records[0].value, Some(7.0));
    }

    #[test]
    fn test_missing_key_label_is_error() {
        let grid = SheetGrid::from_strs("Table 6", &[&["Something else"]]);
        let err = extract_category_table(&grid, "business type", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ListingError::LabelNotFound { .. }));
    }
}
