//! High-level pipeline API: workbook to merged dataset.
//!
//! # Example
//!
//! ```rust,ignore
//! use rsi_extract::{run_pipeline, ExtractionPlan, RunInputs, Workbook};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workbook = Workbook::open(Path::new("mainreferencetables.xlsx"))?;
//!     let output = run_pipeline(&workbook, &ExtractionPlan::default(), RunInputs::default())?;
//!
//!     println!("Extracted {} rows", output.dataset.rows.len());
//!     Ok(())
//! }
//! ```

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::assemble::{assemble, Assembled};
use crate::error::PipelineResult;
use crate::extract::{
    append_unique, extract_listing, run_category_table, run_pass, PassOutput, CONTENTS_LABELS,
    NOTES_LABELS,
};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{
    CategoryRecord, DataRecord, ListingEntry, ReferenceEntry, ReferenceFragment, UnmatchedRecord,
};
use crate::parser::{read_overrides, read_reference_csv, read_series, SeriesData};
use crate::plan::ExtractionPlan;
use crate::reference::{backfill_codes, reconcile, CodeLookup, Reconciliation};
use crate::workbook::Workbook;

/// Inputs besides the workbook.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    /// Manual reference rows appended during reconciliation.
    pub overrides: Vec<ReferenceEntry>,

    /// Single-series download merged into the dataset.
    pub series: Option<SeriesData>,
}

impl RunInputs {
    /// Read the optional override and series files.
    pub fn load(overrides: Option<&Path>, series: Option<&Path>) -> PipelineResult<Self> {
        let overrides = match overrides {
            Some(path) => {
                let rows = read_overrides(path)?;
                log_success(format!("Read {} override rows from {}", rows.len(), path.display()));
                rows
            }
            None => Vec::new(),
        };

        let series = match series {
            Some(path) => {
                let series = read_series(path)?;
                log_success(format!(
                    "Read series {} ({} observations)",
                    series.cdid,
                    series.records.len()
                ));
                Some(series)
            }
            None => None,
        };

        Ok(Self { overrides, series })
    }
}

/// Per-pass counts for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub name: String,
    pub sheets: usize,
    pub blocks: usize,
    pub skipped_blocks: usize,
    pub records: usize,
    pub reference_entries: usize,
    pub unresolved_codes: usize,
}

impl From<&PassOutput> for PassSummary {
    fn from(out: &PassOutput) -> Self {
        Self {
            name: out.name.clone(),
            sheets: out.sheets.len(),
            blocks: out.blocks,
            skipped_blocks: out.skipped_blocks,
            records: out.records.len(),
            reference_entries: out.fragment.len(),
            unresolved_codes: out.unresolved_codes,
        }
    }
}

/// Records of one extraction pass after backfill.
#[derive(Debug, Clone)]
pub struct PassData {
    pub name: String,
    pub records: Vec<DataRecord>,
}

/// Records of one melted category table.
#[derive(Debug, Clone)]
pub struct CategoryData {
    pub name: String,
    pub records: Vec<CategoryRecord>,
}

/// Counts written to `run_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub passes: Vec<PassSummary>,
    pub series_records: usize,
    pub category_records: usize,
    pub rows: usize,
    pub excluded_rows: usize,
    pub reference_entries: usize,
    pub conflicts: usize,
    pub overrides_added: usize,
    pub backfilled: usize,
    pub unmatched: usize,
    pub contents_entries: usize,
    pub notes_entries: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Assembled,
    pub passes: Vec<PassData>,
    pub categories: Vec<CategoryData>,
    pub reconciliation: Reconciliation,
    pub unmatched: Vec<UnmatchedRecord>,
    pub contents: Vec<ListingEntry>,
    pub notes: Vec<ListingEntry>,
    pub summary: RunSummary,
}

/// Run every pass of `plan`, reconcile references, backfill and assemble.
///
/// Only a missing listing sheet, an unreadable input or an invalid plan is
/// fatal. A workbook that yields no records produces an empty dataset.
pub fn run_pipeline(
    workbook: &Workbook,
    plan: &ExtractionPlan,
    inputs: RunInputs,
) -> PipelineResult<RunOutput> {
    plan.validate()?;

    // Step 1: extraction passes
    let mut outputs: Vec<PassOutput> = Vec::with_capacity(plan.passes.len());
    for pass in &plan.passes {
        log_info(format!("📊 Pass '{}' ({})", pass.name, pass.sheet_pattern));
        let out = run_pass(workbook, pass, &outputs)?;
        if out.sheets.is_empty() {
            log_warning(format!("No sheets matched pass '{}'", pass.name));
        } else {
            log_success(format!(
                "{} sheets, {} blocks, {} records",
                out.sheets.len(),
                out.blocks,
                out.records.len()
            ));
        }
        outputs.push(out);
    }

    // Step 2: category tables
    let mut categories = Vec::with_capacity(plan.category_tables.len());
    for spec in &plan.category_tables {
        let records = run_category_table(workbook, spec)?;
        if records.is_empty() {
            log_warning(format!("No records for category table '{}'", spec.name));
        } else {
            log_success(format!("{}: {} records", spec.name, records.len()));
        }
        categories.push(CategoryData {
            name: spec.name.clone(),
            records,
        });
    }

    // Step 3: listings
    let mut contents = read_listing(workbook, plan.contents_sheet.as_deref(), CONTENTS_LABELS)?;
    let notes = read_listing(workbook, plan.notes_sheet.as_deref(), NOTES_LABELS)?;

    // Step 4: reconcile references
    log_info("🔗 Reconciling reference table...");
    let fragments: Vec<ReferenceFragment> = outputs.iter().map(|o| o.fragment.clone()).collect();
    let reconciliation = reconcile(&fragments, &inputs.overrides);
    log_success(format!(
        "{} codes, {} conflicts, {} overrides added",
        reconciliation.entries.len(),
        reconciliation.conflicts.len(),
        reconciliation.overrides_added
    ));

    // Step 5: backfill missing codes
    let passes: Vec<PassSummary> = outputs.iter().map(PassSummary::from).collect();
    let spans: Vec<(String, usize)> = outputs
        .iter()
        .map(|o| (o.name.clone(), o.records.len()))
        .collect();
    let mut records: Vec<_> = outputs.into_iter().flat_map(|o| o.records).collect();
    let lookup = CodeLookup::from_entries(&reconciliation.entries);
    let backfill = backfill_codes(&mut records, &lookup);
    if backfill.unmatched.is_empty() {
        log_success(format!("{} codes backfilled", backfill.filled));
    } else {
        log_warning(format!(
            "{} codes backfilled, {} descriptions unmatched",
            backfill.filled,
            backfill.unmatched.len()
        ));
    }

    let mut offset = 0;
    let pass_data: Vec<PassData> = spans
        .into_iter()
        .map(|(name, len)| {
            let records = records[offset..offset + len].to_vec();
            offset += len;
            PassData { name, records }
        })
        .collect();

    // Step 6: series
    let mut series_records = 0;
    if let Some(series) = inputs.series {
        series_records = series.records.len();
        append_unique(
            &mut contents,
            ListingEntry {
                key: series.cdid.clone(),
                value: series.title.clone(),
            },
        );
        records.extend(series.records);
    }

    if records.is_empty() {
        log_warning("No records extracted; the dataset will be empty");
    }

    // Step 7: assemble
    log_info("📦 Assembling dataset...");
    let dataset = assemble(records, &plan.excluded_tables);
    log_success(format!(
        "{} rows, {} tables",
        dataset.rows.len(),
        dataset.tables.len()
    ));

    let summary = RunSummary {
        generated_at: Utc::now().to_rfc3339(),
        passes,
        series_records,
        category_records: categories.iter().map(|c| c.records.len()).sum(),
        rows: dataset.rows.len(),
        excluded_rows: dataset.excluded,
        reference_entries: reconciliation.entries.len(),
        conflicts: reconciliation.conflicts.len(),
        overrides_added: reconciliation.overrides_added,
        backfilled: backfill.filled,
        unmatched: backfill.unmatched.len(),
        contents_entries: contents.len(),
        notes_entries: notes.len(),
    };

    Ok(RunOutput {
        dataset,
        passes: pass_data,
        categories,
        reconciliation,
        unmatched: backfill.unmatched,
        contents,
        notes,
        summary,
    })
}

/// Read a configured listing sheet.
///
/// A missing sheet is fatal; a sheet without the expected header is skipped.
fn read_listing(
    workbook: &Workbook,
    sheet: Option<&str>,
    (key_label, value_label): (&str, &str),
) -> PipelineResult<Vec<ListingEntry>> {
    let Some(sheet) = sheet else {
        return Ok(Vec::new());
    };
    let grid = workbook.sheet(sheet)?;
    match extract_listing(grid, key_label, value_label) {
        Ok(entries) => {
            log_success(format!("{}: {} entries", sheet, entries.len()));
            Ok(entries)
        }
        Err(e) => {
            warn!(error = %e, "skipping listing");
            Ok(Vec::new())
        }
    }
}

/// Reconcile reference CSVs from earlier runs without touching a workbook.
pub fn reconcile_files(
    references: &[PathBuf],
    overrides: Option<&Path>,
) -> PipelineResult<Reconciliation> {
    let mut fragments = Vec::with_capacity(references.len());
    for path in references {
        let entries = read_reference_csv(path)?;
        log_success(format!("{}: {} rows", path.display(), entries.len()));
        fragments.push(ReferenceFragment::new(path.display().to_string(), entries));
    }

    let overrides = match overrides {
        Some(path) => read_overrides(path)?,
        None => Vec::new(),
    };

    Ok(reconcile(&fragments, &overrides))
}
