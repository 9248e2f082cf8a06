//! Workbook loading.
//!
//! Every sheet is read eagerly into a [`SheetGrid`] at absolute cell
//! positions, so row and column indices match what a spreadsheet user sees
//! (minus one).

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{WorkbookError, WorkbookResult};
use crate::models::SheetGrid;

/// All sheets of a workbook, in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<SheetGrid>,
}

impl Workbook {
    /// Open an xlsx/xlsm/xlsb/xls/ods file (format detected from the extension).
    pub fn open(path: &Path) -> WorkbookResult<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names().to_vec();

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| WorkbookError::SheetRead {
                    sheet: name.clone(),
                    message: e.to_string(),
                })?;
            let grid = range_to_grid(&name, &range);
            debug!(sheet = %name, rows = grid.height(), cols = grid.width(), "loaded sheet");
            sheets.push(grid);
        }

        info!(path = %path.display(), sheets = sheets.len(), "workbook opened");
        Ok(Self { sheets })
    }

    /// Build a workbook from grids already in memory.
    pub fn from_sheets(sheets: Vec<SheetGrid>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> WorkbookResult<&SheetGrid> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| WorkbookError::MissingSheet(name.to_string()))
    }

    pub fn sheets(&self) -> &[SheetGrid] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Text of one cell; errors and empty cells are absent.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::Empty | Data::Error(_) => None,
        other => Some(format!("{}", other)),
    }
}

/// Convert a used range to a grid anchored at A1.
fn range_to_grid(name: &str, range: &Range<Data>) -> SheetGrid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Option<String>>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![None; col_offset];
        cells.extend(row.iter().map(cell_text));
        rows.push(cells);
    }

    SheetGrid::new(name, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_conversion() {
        assert_eq!(cell_text(&Data::String("x".into())), Some("x".to_string()));
        assert_eq!(cell_text(&Data::String(String::new())), Some(String::new()));
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Float(2023.0)), Some("2023".to_string()));
        assert_eq!(cell_text(&Data::Float(101.25)), Some("101.25".to_string()));
        assert_eq!(cell_text(&Data::Int(7)), Some("7".to_string()));
    }

    #[test]
    fn test_range_offset_is_padded() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Time Period".into()));
        range.set_value((3, 2), Data::Float(1.5));

        let grid = range_to_grid("S", &range);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.cell(0, 0), None);
        assert_eq!(grid.cell(2, 1), Some("Time Period"));
        assert_eq!(grid.cell(3, 2), Some("1.5"));
    }

    #[test]
    fn test_missing_sheet() {
        let wb = Workbook::from_sheets(vec![SheetGrid::from_strs("Contents", &[&["x"]])]);
        assert_eq!(wb.sheet_names(), vec!["Contents"]);
        assert!(wb.sheet("Contents").is_ok());
        assert!(matches!(wb.sheet("Notes"), Err(WorkbookError::MissingSheet(_))));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        assert!(Workbook::open(&path).is_err());
    }
}
