//! Header resolution for table blocks.
//!
//! A block's first rows describe its columns: the time period description
//! (marker) row, the aggregation/SIC code row, dataset identifiers, and for
//! some tables sales and weight rows. Which physical row carries which field
//! is decided either by a fixed layout or by matching each row's leading cell
//! against a [`LabelDictionary`].
//!
//! ```text
//! row 0  Time Period        | All retailing [note1] | Food stores
//! row 1  Agg/SIC code       | ALL                   | 47.11
//! row 2  Dataset identifier | J5C4                  | EAFS
//! row 3  2023 Jan           | 101.2                 | 99.8        <- data starts
//! ```

use std::collections::BTreeMap;
use tracing::debug;

use super::text::clean_text;
use crate::error::HeaderError;
use crate::models::{ColumnMapping, SheetGrid, TableBlock};
use crate::plan::{DataOffset, HeaderConvention, HeaderField, LabelDictionary};

/// Which block-relative row carries each field, and how many rows the header uses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderLayout {
    pub field_rows: BTreeMap<HeaderField, usize>,
    /// Rows consumed by the header; data starts at `block.start + consumed`.
    pub consumed: usize,
}

impl HeaderLayout {
    pub fn row_of(&self, field: HeaderField) -> Option<usize> {
        self.field_rows.get(&field).copied()
    }

    /// Absolute index of the first data row, clamped to the block.
    pub fn data_start(&self, block: &TableBlock) -> usize {
        (block.start + self.consumed).min(block.end)
    }

    /// One past the last header row referenced by a field.
    fn span(&self) -> usize {
        self.field_rows.values().max().map(|r| r + 1).unwrap_or(0)
    }
}

/// Decide which rows carry which field.
pub fn resolve_layout(
    grid: &SheetGrid,
    block: &TableBlock,
    convention: &HeaderConvention,
    labels: &LabelDictionary,
) -> Result<HeaderLayout, HeaderError> {
    match convention {
        HeaderConvention::Fixed { rows } => {
            if block.len() < rows.len() {
                return Err(HeaderError::TruncatedHeader {
                    sheet: block.sheet_name.clone(),
                    table: block.table_name.clone(),
                    available: block.len(),
                    needed: rows.len(),
                });
            }
            let mut field_rows = BTreeMap::new();
            for (offset, field) in rows.iter().enumerate() {
                field_rows.entry(*field).or_insert(offset);
            }
            Ok(HeaderLayout {
                field_rows,
                consumed: rows.len(),
            })
        }

        HeaderConvention::Labelled {
            max_rows,
            data_offset,
        } => {
            let scan = (*max_rows).min(block.len());
            let mut field_rows = BTreeMap::new();

            for offset in 0..scan {
                let leading = grid.cell(block.start + offset, 0).unwrap_or("");
                for field in labels.matches(leading) {
                    field_rows.entry(field).or_insert(offset);
                }
            }

            let mut layout = HeaderLayout {
                field_rows,
                consumed: 0,
            };
            layout.consumed = match data_offset {
                DataOffset::AfterLastMatch => layout.span(),
                DataOffset::LabelCount => layout.field_rows.len(),
                DataOffset::Rows(n) => *n,
            };

            debug!(
                sheet = %block.sheet_name,
                table = %block.table_name,
                fields = ?layout.field_rows,
                consumed = layout.consumed,
                "resolved labelled header"
            );
            Ok(layout)
        }
    }
}

/// Build one mapping per data column whose key field is non-empty.
///
/// Column 0 holds the date label and never becomes a mapping. Fields absent
/// from the layout read as empty strings.
pub fn build_mappings(
    grid: &SheetGrid,
    block: &TableBlock,
    layout: &HeaderLayout,
    key_field: HeaderField,
) -> Result<Vec<ColumnMapping>, HeaderError> {
    if layout.row_of(key_field).is_none() {
        return Err(HeaderError::MissingKeyField {
            sheet: block.sheet_name.clone(),
            table: block.table_name.clone(),
            field: key_field.as_str().to_string(),
        });
    }

    let header_end = (block.start + layout.span()).min(block.end);
    let width = grid.width_between(block.start, header_end);

    let read = |field: HeaderField, col: usize| -> Option<&str> {
        layout
            .row_of(field)
            .and_then(|offset| grid.cell(block.start + offset, col))
    };

    let mut mappings = Vec::new();
    for col in 1..width {
        let text = |field| read(field, col).map(str::trim).unwrap_or("").to_string();

        let (description, note_ref) = clean_text(read(HeaderField::TimePeriodDescription, col));
        let mapping = ColumnMapping {
            col_index: col,
            agg_sic_code: text(HeaderField::AggSicCode),
            dataset_code: text(HeaderField::DatasetCode),
            time_period_description: description,
            note_ref,
            sales_in_2022_mln: text(HeaderField::Sales),
            percentage_weight: text(HeaderField::PercentageWeight),
            average_sales_2022: text(HeaderField::AverageSales2022),
            sheet_name: block.sheet_name.clone(),
            table_name: block.table_name.clone(),
        };

        let key = match key_field {
            HeaderField::TimePeriodDescription => mapping.time_period_description.as_str(),
            HeaderField::AggSicCode => mapping.agg_sic_code.as_str(),
            HeaderField::DatasetCode => mapping.dataset_code.as_str(),
            HeaderField::Sales => mapping.sales_in_2022_mln.as_str(),
            HeaderField::PercentageWeight => mapping.percentage_weight.as_str(),
            HeaderField::AverageSales2022 => mapping.average_sales_2022.as_str(),
        };
        if !key.is_empty() {
            mappings.push(mapping);
        }
    }

    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::segment::segment_sheet;

    fn fixed3() -> HeaderConvention {
        HeaderConvention::Fixed {
            rows: vec![
                HeaderField::TimePeriodDescription,
                HeaderField::AggSicCode,
                HeaderField::DatasetCode,
            ],
        }
    }

    fn labelled(offset: DataOffset) -> HeaderConvention {
        HeaderConvention::Labelled {
            max_rows: 5,
            data_offset: offset,
        }
    }

    #[test]
    fn test_fixed_header_mappings() {
        let grid = SheetGrid::from_strs(
            "CPSA",
            &[
                &["Retail sales"],
                &["Time Period", "All retailing [note1]", "Food stores", "No code"],
                &["", "ALL", "47.11", ""],
                &["", "J5C4", "EAFS", "XXXX"],
                &["2023 Jan", "101.2", "99.8", "1"],
            ],
        );
        let block = &segment_sheet(&grid)[0];
        let layout = resolve_layout(&grid, block, &fixed3(), &LabelDictionary::default()).unwrap();
        assert_eq!(layout.consumed, 3);
        assert_eq!(layout.data_start(block), 4);

        let mappings = build_mappings(&grid, block, &layout, HeaderField::AggSicCode).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].col_index, 1);
        assert_eq!(mappings[0].agg_sic_code, "ALL");
        assert_eq!(mappings[0].time_period_description, "All retailing");
        assert_eq!(mappings[0].note_ref, "Note1");
        assert_eq!(mappings[0].dataset_code, "J5C4");
        assert_eq!(mappings[0].table_name, "Retail sales");
        assert_eq!(mappings[1].agg_sic_code, "47.11");
        assert_eq!(mappings[1].note_ref, "");
    }

    #[test]
    fn test_fixed_header_truncated() {
        let grid = SheetGrid::from_strs("S", &[&["Time Period", "a"], &["", "X"]]);
        let block = &segment_sheet(&grid)[0];
        let err = resolve_layout(&grid, block, &fixed3(), &LabelDictionary::default()).unwrap_err();
        assert!(matches!(err, HeaderError::TruncatedHeader { available: 2, needed: 3, .. }));
    }

    #[test]
    fn test_labelled_reordered_fields() {
        let grid = SheetGrid::from_strs(
            "Table 1 M",
            &[
                &["Time Period", "All retailing", "Food"],
                &["Dataset identifier code", "J5C4", "EAFS"],
                &["Sales in 2022 (£ millions)", "£8,500m", "3,100"],
                &["Agg/SIC code", "ALL", "47.11"],
                &["2023 Jan", "101.2", "99.8"],
            ],
        );
        let block = &segment_sheet(&grid)[0];
        let layout = resolve_layout(
            &grid,
            block,
            &labelled(DataOffset::LabelCount),
            &LabelDictionary::default(),
        )
        .unwrap();

        assert_eq!(layout.row_of(HeaderField::TimePeriodDescription), Some(0));
        assert_eq!(layout.row_of(HeaderField::DatasetCode), Some(1));
        assert_eq!(layout.row_of(HeaderField::Sales), Some(2));
        assert_eq!(layout.row_of(HeaderField::AggSicCode), Some(3));
        assert_eq!(layout.row_of(HeaderField::PercentageWeight), None);
        assert_eq!(layout.consumed, 4);

        let mappings = build_mappings(&grid, block, &layout, HeaderField::AggSicCode).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].sales_in_2022_mln, "£8,500m");
        assert_eq!(mappings[0].percentage_weight, "");
        assert_eq!(mappings[1].dataset_code, "EAFS");
    }

    #[test]
    fn test_labelled_first_match_wins() {
        let grid = SheetGrid::from_strs(
            "S",
            &[
                &["Time Period", "A"],
                &["Agg/SIC code", "X1"],
                &["Agg/SIC code (old)", "X2"],
                &["2023", "1"],
            ],
        );
        let block = &segment_sheet(&grid)[0];
        let layout = resolve_layout(
            &grid,
            block,
            &labelled(DataOffset::AfterLastMatch),
            &LabelDictionary::default(),
        )
        .unwrap();
        assert_eq!(layout.row_of(HeaderField::AggSicCode), Some(1));
        // highest matched row is 1, so data starts at row 2
        assert_eq!(layout.consumed, 2);
    }

    #[test]
    fn test_labelled_scan_limited_to_max_rows() {
        let grid = SheetGrid::from_strs(
            "S",
            &[
                &["Time Period", "A"],
                &["note"],
                &["note"],
                &["Agg/SIC code", "X1"],
            ],
        );
        let block = &segment_sheet(&grid)[0];
        let convention = HeaderConvention::Labelled {
            max_rows: 3,
            data_offset: DataOffset::Rows(3),
        };
        let layout = resolve_layout(&grid, block, &convention, &LabelDictionary::default()).unwrap();
        assert_eq!(layout.row_of(HeaderField::AggSicCode), None);
        assert_eq!(layout.consumed, 3);

        let err = build_mappings(&grid, block, &layout, HeaderField::AggSicCode).unwrap_err();
        assert!(matches!(err, HeaderError::MissingKeyField { .. }));
    }

    #[test]
    fn test_description_keyed_mappings() {
        let grid = SheetGrid::from_strs(
            "Table 3 M",
            &[
                &["Time Period", "Food stores, all businesses", "", "Fuel, small businesses"],
                &["Dataset identifier code", "A1", "A2", "A3"],
                &["2023 Jan", "1", "2", "3"],
            ],
        );
        let block = &segment_sheet(&grid)[0];
        let layout = resolve_layout(
            &grid,
            block,
            &labelled(DataOffset::LabelCount),
            &LabelDictionary::default(),
        )
        .unwrap();
        let mappings =
            build_mappings(&grid, block, &layout, HeaderField::TimePeriodDescription).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].agg_sic_code, "");
        assert_eq!(mappings[1].col_index, 3);
        assert_eq!(mappings[1].dataset_code, "A3");
    }
}
