//! Domain models for the extraction pipeline.
//!
//! - [`SheetGrid`] - Raw addressable cell grid for one worksheet
//! - [`TableBlock`] - One table located inside a sheet
//! - [`ColumnMapping`] - Role of one data column inside a block
//! - [`DataRecord`] - One observation in long format
//! - [`CategoryRecord`] - One cell of a melted category table
//! - [`Frequency`] - Annual / monthly / quarterly classification
//! - [`ReferenceEntry`] - Code metadata row
//! - [`ConflictLogRecord`] - Audit trail for dropped reference rows
//! - [`UnmatchedRecord`] - Records left without a code after backfill

use serde::{Deserialize, Serialize};

// =============================================================================
// Sheet Grid
// =============================================================================

/// A worksheet as a row-major grid of optional text cells.
///
/// `None` means the cell is absent; `Some("")` is an empty string cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    rows: Vec<Vec<Option<String>>>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a grid from string literals, treating `""` as an absent cell.
    ///
    /// Mostly useful for tests and fixtures.
    pub fn from_strs(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                    .collect()
            })
            .collect();
        Self::new(name, rows)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text at `(row, col)`, `None` if absent or out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// All cells of one row (empty slice if out of range).
    pub fn row(&self, row: usize) -> &[Option<String>] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Widest row length within `[start, end)`.
    pub fn width_between(&self, start: usize, end: usize) -> usize {
        let end = end.min(self.rows.len());
        if start >= end {
            return 0;
        }
        self.rows[start..end].iter().map(Vec::len).max().unwrap_or(0)
    }
}

// =============================================================================
// Table Block
// =============================================================================

/// A contiguous row range `[start, end)` holding one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBlock {
    pub sheet_name: String,
    pub table_name: String,
    /// Marker row (inclusive).
    pub start: usize,
    /// Next marker row or sheet end (exclusive).
    pub end: usize,
}

impl TableBlock {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Column Mapping
// =============================================================================

/// Role of one data column within a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub col_index: usize,
    pub agg_sic_code: String,
    pub dataset_code: String,
    pub time_period_description: String,
    pub note_ref: String,
    pub sales_in_2022_mln: String,
    pub percentage_weight: String,
    pub average_sales_2022: String,
    pub sheet_name: String,
    pub table_name: String,
}

impl ColumnMapping {
    /// The reference row this column contributes.
    pub fn to_reference(&self) -> ReferenceEntry {
        ReferenceEntry {
            agg_sic_code: self.agg_sic_code.clone(),
            time_period_description: self.time_period_description.clone(),
            note_ref: self.note_ref.clone(),
            sales_in_2022_mln: self.sales_in_2022_mln.clone(),
            percentage_weight: self.percentage_weight.clone(),
        }
    }
}

// =============================================================================
// Frequency
// =============================================================================

/// Periodicity of a date label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Annual,
    Monthly,
    Quarterly,
    Unknown,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Data Record
// =============================================================================

/// One observation in long format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub sheet_name: String,
    pub table_name: String,
    pub date: String,
    pub value: f64,
    pub frequency: Frequency,
    pub agg_sic_code: String,
    pub dataset_code: String,
    #[serde(default)]
    pub time_period_description: String,
    #[serde(default)]
    pub note_ref: String,
    #[serde(default)]
    pub average_sales_2022: String,
}

impl DataRecord {
    pub fn has_code(&self) -> bool {
        !self.agg_sic_code.trim().is_empty()
    }
}

// =============================================================================
// Category Record
// =============================================================================

/// One cell of a single-header table keyed by a category column.
///
/// Non-numeric cells are kept with `value: None` so their footnote survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub sheet_name: String,
    pub category: String,
    pub column_type: String,
    pub value: Option<f64>,
    pub note_ref: String,
}

// =============================================================================
// Reference Entry
// =============================================================================

/// Metadata for one reconciliation code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(default)]
    pub agg_sic_code: String,
    #[serde(default)]
    pub time_period_description: String,
    #[serde(default)]
    pub note_ref: String,
    #[serde(default, alias = "sales_in_2022", alias = "sales_in_2022_£_mln")]
    pub sales_in_2022_mln: String,
    #[serde(default)]
    pub percentage_weight: String,
}

impl ReferenceEntry {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            agg_sic_code: code.into(),
            time_period_description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note_ref = note.into();
        self
    }

    pub fn with_sales(mut self, sales: impl Into<String>) -> Self {
        self.sales_in_2022_mln = sales.into();
        self
    }

    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.percentage_weight = weight.into();
        self
    }
}

/// Reference rows produced by one extraction pass or input file, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReferenceFragment {
    pub source: String,
    pub entries: Vec<ReferenceEntry>,
}

impl ReferenceFragment {
    pub fn new(source: impl Into<String>, entries: Vec<ReferenceEntry>) -> Self {
        Self {
            source: source.into(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Audit Logs
// =============================================================================

/// Which key a reconciliation conflict was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictType {
    #[serde(rename = "time_period_description")]
    Description,
    #[serde(rename = "agg_sic_code")]
    Code,
}

/// A reference row dropped in favour of an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictLogRecord {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub time_period_description: String,
    pub kept_agg_sic_code: String,
    pub dropped_agg_sic_code: String,
}

/// A record still missing its code after backfill.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnmatchedRecord {
    pub sheet_name: String,
    pub table_name: String,
    pub dataset_code: String,
    pub time_period_description: String,
}

/// A key/value row from a listing sheet such as Contents or Notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_vs_empty_cell() {
        let grid = SheetGrid::new(
            "S",
            vec![vec![None, Some(String::new()), Some("x".into())]],
        );
        assert_eq!(grid.cell(0, 0), None);
        assert_eq!(grid.cell(0, 1), Some(""));
        assert_eq!(grid.cell(0, 2), Some("x"));
        assert_eq!(grid.cell(5, 5), None);
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = SheetGrid::from_strs("S", &[&["a"], &["a", "b", "c"], &[]]);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.width_between(0, 1), 1);
        assert_eq!(grid.width_between(2, 10), 0);
        assert_eq!(grid.width_between(4, 2), 0);
    }

    #[test]
    fn test_conflict_type_serialization() {
        let json = serde_json::to_string(&ConflictType::Code).unwrap();
        assert_eq!(json, "\"agg_sic_code\"");
        let json = serde_json::to_string(&ConflictType::Description).unwrap();
        assert_eq!(json, "\"time_period_description\"");
    }

    #[test]
    fn test_reference_entry_aliases() {
        let entry: ReferenceEntry =
            serde_json::from_str(r#"{"agg_sic_code":"X","sales_in_2022":"12"}"#).unwrap();
        assert_eq!(entry.sales_in_2022_mln, "12");
        assert_eq!(entry.time_period_description, "");
    }
}
