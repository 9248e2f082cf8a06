//! Data row extraction: one record per (date row, mapped column) cell.

use super::text::{coerce_number, non_blank};
use crate::models::{ColumnMapping, DataRecord, Frequency, SheetGrid};

/// Walk rows `[start, end)` and emit a record for every numeric mapped cell.
///
/// Rows without a date label are skipped, as are absent or non-numeric cells.
/// Unknown frequencies are kept.
pub fn extract_rows(
    grid: &SheetGrid,
    start: usize,
    end: usize,
    mappings: &[ColumnMapping],
) -> Vec<DataRecord> {
    let mut records = Vec::new();

    for row in start..end.min(grid.height()) {
        let Some(date) = non_blank(grid.cell(row, 0)) else {
            continue;
        };
        let frequency = Frequency::classify(date);

        for mapping in mappings {
            let Some(value) = grid.cell(row, mapping.col_index).and_then(coerce_number) else {
                continue;
            };
            records.push(DataRecord {
                sheet_name: mapping.sheet_name.clone(),
                table_name: mapping.table_name.clone(),
                date: date.to_string(),
                value,
                frequency,
                agg_sic_code: mapping.agg_sic_code.clone(),
                dataset_code: mapping.dataset_code.clone(),
                time_period_description: mapping.time_period_description.clone(),
                note_ref: mapping.note_ref.clone(),
                average_sales_2022: mapping.average_sales_2022.clone(),
            });
        }
    }

    records
}
