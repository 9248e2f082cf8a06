//! Running one extraction pass over the workbook.
//!
//! For every sheet the pass matches: segment into blocks, resolve each
//! block's header, build column mappings, derive codes if the pass looks them
//! up by description, then extract the data rows. Blocks with a broken header
//! are skipped with a warning.

use tracing::{debug, info, warn};

use super::derive::{derive_codes, DescriptionIndex};
use super::header::{build_mappings, resolve_layout};
use super::rows::extract_rows;
use super::segment::segment_sheet;
use crate::error::{PipelineResult, PlanError};
use crate::models::{DataRecord, ReferenceFragment};
use crate::plan::{CodeSource, PassSpec};
use crate::reference::FragmentBuilder;
use crate::workbook::Workbook;

/// Everything one pass produced.
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    pub name: String,
    pub sheets: Vec<String>,
    pub blocks: usize,
    pub skipped_blocks: usize,
    pub unresolved_codes: usize,
    pub records: Vec<DataRecord>,
    pub fragment: ReferenceFragment,
}

/// Run `pass` against `workbook`.
///
/// `earlier` holds the outputs of passes that already ran; a description
/// lookup pass reads its referenced pass's fragment from there.
pub fn run_pass(
    workbook: &Workbook,
    pass: &PassSpec,
    earlier: &[PassOutput],
) -> PipelineResult<PassOutput> {
    let index = match &pass.code_source {
        CodeSource::Header | CodeSource::Backfill => None,
        CodeSource::DescriptionLookup {
            reference_pass,
            suffixes,
        } => {
            let source = earlier
                .iter()
                .find(|o| &o.name == reference_pass)
                .ok_or_else(|| PlanError::UnknownReferencePass {
                    pass: pass.name.clone(),
                    reference: reference_pass.clone(),
                })?;
            let index = DescriptionIndex::from_fragment(&source.fragment);
            debug!(pass = %pass.name, descriptions = index.len(), "description index built");
            Some((index, suffixes))
        }
    };

    let sheet_names = workbook.sheet_names();
    let mut output = PassOutput {
        name: pass.name.clone(),
        ..Default::default()
    };
    let mut fragment = FragmentBuilder::new();
    let key_field = pass.code_source.key_field();

    for sheet_name in pass.matching_sheets(&sheet_names)? {
        let grid = workbook.sheet(sheet_name)?;
        output.sheets.push(sheet_name.to_string());

        for block in segment_sheet(grid) {
            output.blocks += 1;

            let mappings = resolve_layout(grid, &block, &pass.header, &pass.labels).and_then(
                |layout| {
                    build_mappings(grid, &block, &layout, key_field).map(|m| (layout, m))
                },
            );
            let (layout, mut mappings) = match mappings {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(pass = %pass.name, error = %e, "skipping block");
                    output.skipped_blocks += 1;
                    continue;
                }
            };

            if let Some((index, suffixes)) = &index {
                output.unresolved_codes += derive_codes(&mut mappings, index, suffixes);
            }

            for mapping in &mappings {
                fragment.insert(mapping.to_reference());
            }

            let records = extract_rows(grid, layout.data_start(&block), block.end, &mappings);
            debug!(
                sheet = %sheet_name,
                table = %block.table_name,
                columns = mappings.len(),
                records = records.len(),
                "block extracted"
            );
            output.records.extend(records);
        }
    }

    output.fragment = fragment.build(pass.name.clone());

    info!(
        pass = %output.name,
        sheets = output.sheets.len(),
        blocks = output.blocks,
        skipped = output.skipped_blocks,
        records = output.records.len(),
        references = output.fragment.len(),
        "pass complete"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SheetGrid;
    use crate::plan::ExtractionPlan;

    fn workbook() -> Workbook {
        Workbook::from_sheets(vec![
            SheetGrid::from_strs(
                "Table 1 M",
                &[
                    &["Value of retail sales"],
                    &["Time Period", "All retailing [note1]", "Food stores"],
                    &["Agg/SIC code", "ALL", "47.11"],
                    &["Dataset identifier code", "J5C4", "EAFS"],
                    &["2023 Jan", "101.2", "99.8"],
                    &["2023 Feb", "102.0", "[x]"],
                ],
            ),
            SheetGrid::from_strs(
                "Table 3 M",
                &[
                    &["Small and large businesses"],
                    &[
                        "Time Period",
                        "Food stores, small businesses",
                        "Food stores, large businesses",
                        "Unknown stores, all businesses",
                    ],
                    &["Dataset identifier code", "A1", "A2", "A3"],
                    &["", "", "", ""],
                    &["2023 Jan", "1", "2", "3"],
                ],
            ),
            SheetGrid::from_strs("Table 4 M", &[&["No table here"]]),
        ])
    }

    #[test]
    fn test_header_pass() {
        let plan = ExtractionPlan::default();
        let out = run_pass(&workbook(), plan.pass("multiheader").unwrap(), &[]).unwrap();

        assert_eq!(out.sheets, vec!["Table 1 M"]);
        assert_eq!(out.blocks, 1);
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.fragment.len(), 2);
        assert_eq!(out.fragment.entries[0].note_ref, "Note1");
        assert_eq!(out.records[0].table_name, "Value of retail sales");
    }

    #[test]
    fn test_lookup_pass_derives_codes() {
        let plan = ExtractionPlan::default();
        let wb = workbook();
        let first = run_pass(&wb, plan.pass("multiheader").unwrap(), &[]).unwrap();
        let out = run_pass(&wb, plan.pass("table_3_4").unwrap(), &[first]).unwrap();

        assert_eq!(out.sheets, vec!["Table 3 M", "Table 4 M"]);
        assert_eq!(out.blocks, 1);
        assert_eq!(out.unresolved_codes, 1);
        let codes: Vec<_> = out.records.iter().map(|r| r.agg_sic_code.as_str()).collect();
        assert_eq!(codes, vec!["47.11-SB", "47.11-LB", ""]);
        assert_eq!(out.fragment.len(), 2);
    }

    #[test]
    fn test_lookup_pass_without_reference_output() {
        let plan = ExtractionPlan::default();
        let err = run_pass(&workbook(), plan.pass("table_3_4").unwrap(), &[]).unwrap_err();
        assert!(err.to_string().contains("multiheader"));
    }

    #[test]
    fn test_dataset_keyed_pass() {
        let wb = Workbook::from_sheets(vec![SheetGrid::from_strs(
            "Table 5",
            &[
                &["Average weekly sales"],
                &["Time Period", "All retailing [note4]", "Food stores", "Not published"],
                &["Average weekly sales in 2022 (£ millions)", "8,500", "3,100", "12"],
                &["Dataset identifier code", "J5C4", "EAFS", ""],
                &["2023 Jan", "101.2", "99.8", "5"],
                &["2023 Feb", "[x]", "100.1", "6"],
            ],
        )]);
        let plan = ExtractionPlan::default();
        let out = run_pass(&wb, plan.pass("table_5").unwrap(), &[]).unwrap();

        assert_eq!(out.sheets, vec!["Table 5"]);
        assert_eq!(out.skipped_blocks, 0);
        assert_eq!(out.records.len(), 3);
        assert!(out.fragment.is_empty());

        let first = &out.records[0];
        assert_eq!(first.dataset_code, "J5C4");
        assert_eq!(first.agg_sic_code, "");
        assert_eq!(first.time_period_description, "All retailing");
        assert_eq!(first.note_ref, "Note4");
        assert_eq!(first.average_sales_2022, "8,500");
        assert_eq!(out.records[2].dataset_code, "EAFS");
        assert_eq!(out.records[2].date, "2023 Feb");
    }

    #[test]
    fn test_dataset_keyed_pass_without_sales_row() {
        let wb = Workbook::from_sheets(vec![SheetGrid::from_strs(
            "Table 5",
            &[
                &["Time Period", "All retailing"],
                &["Dataset identifier code", "J5C4"],
                &["", ""],
                &["2023", "99.5"],
            ],
        )]);
        let plan = ExtractionPlan::default();
        let out = run_pass(&wb, plan.pass("table_5").unwrap(), &[]).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].average_sales_2022, "");
        assert_eq!(out.records[0].value, 99.5);
    }

    #[test]
    fn test_broken_block_is_skipped() {
        let wb = Workbook::from_sheets(vec![SheetGrid::from_strs(
            "CPSA1",
            &[&["Time Period", "x"], &["", "ALL"]],
        )]);
        let plan = ExtractionPlan::default();
        let out = run_pass(&wb, plan.pass("dual_table").unwrap(), &[]).unwrap();
        assert_eq!(out.blocks, 1);
        assert_eq!(out.skipped_blocks, 1);
        assert!(out.records.is_empty());
    }
}
