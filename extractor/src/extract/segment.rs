//! Split a sheet into table blocks at "Time Period" marker rows.

use tracing::debug;

use crate::models::{SheetGrid, TableBlock};

/// Text whose presence in any cell marks the first header row of a block.
pub const MARKER_TEXT: &str = "time period";

/// Row indices containing the marker text, ascending.
pub fn marker_rows(grid: &SheetGrid) -> Vec<usize> {
    (0..grid.height())
        .filter(|&r| {
            grid.row(r)
                .iter()
                .flatten()
                .any(|cell| cell.to_lowercase().contains(MARKER_TEXT))
        })
        .collect()
}

/// Locate every table block on a sheet.
///
/// A sheet without marker rows yields no blocks.
pub fn segment_sheet(grid: &SheetGrid) -> Vec<TableBlock> {
    let markers = marker_rows(grid);

    let blocks: Vec<TableBlock> = markers
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = markers.get(i + 1).copied().unwrap_or(grid.height());
            TableBlock {
                sheet_name: grid.name.clone(),
                table_name: table_name_for(grid, start, i),
                start,
                end,
            }
        })
        .collect();

    debug!(sheet = %grid.name, blocks = blocks.len(), "segmented sheet");
    blocks
}

/// First non-empty cell of the row above the marker, or a synthesized name.
fn table_name_for(grid: &SheetGrid, marker_row: usize, index: usize) -> String {
    marker_row
        .checked_sub(1)
        .and_then(|above| {
            grid.row(above)
                .iter()
                .flatten()
                .map(|c| c.trim())
                .find(|c| !c.is_empty())
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}_table_{}", grid.name, index + 1))
}
