//! Writing run artifacts to an output directory.
//!
//! | File | Rows |
//! |------|------|
//! | `rsi_data_merged.csv` | [`DatasetRow`] |
//! | `agg_reference_merged.csv` | [`ReferenceEntry`] |
//! | `agg_reference_duplicates_log.csv` | [`ConflictLogRecord`] |
//! | `unmatched_log.csv` | [`UnmatchedRecord`] |
//! | `clean_table_name.csv` | [`TableNameEntry`] |
//! | `cleaned_contents.csv` | contents listing |
//! | `cleaned_notes.csv` | notes listing |
//! | `run_summary.json` | [`RunSummary`] |
//! | `<pass>_data.csv` | [`DataRecord`] of one pass, codes backfilled |
//! | `<category table>_data.csv` | [`CategoryRecord`] |
//!
//! Every CSV gets a header row, even when it has no data rows.

use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ExportResult;
use crate::models::{
    CategoryRecord, ConflictLogRecord, DataRecord, ListingEntry, ReferenceEntry, UnmatchedRecord,
};
use crate::reference::Reconciliation;
use crate::transform::{DatasetRow, RunOutput, RunSummary, TableNameEntry};

pub const DATASET_FILE: &str = "rsi_data_merged.csv";
pub const REFERENCE_FILE: &str = "agg_reference_merged.csv";
pub const CONFLICTS_FILE: &str = "agg_reference_duplicates_log.csv";
pub const UNMATCHED_FILE: &str = "unmatched_log.csv";
pub const TABLES_FILE: &str = "clean_table_name.csv";
pub const CONTENTS_FILE: &str = "cleaned_contents.csv";
pub const NOTES_FILE: &str = "cleaned_notes.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// File name for the records of one pass or category table.
pub fn data_file_name(name: &str) -> String {
    format!("{}_data.csv", name)
}

const PASS_COLUMNS: &[&str] = &[
    "sheet_name",
    "table_name",
    "date",
    "value",
    "frequency",
    "agg_sic_code",
    "dataset_code",
    "time_period_description",
    "note_ref",
    "average_sales_2022",
];
const CATEGORY_COLUMNS: &[&str] = &["sheet_name", "category", "column_type", "value", "note_ref"];

const DATASET_COLUMNS: &[&str] = &[
    "sheet_name",
    "table_code",
    "date",
    "value",
    "frequency",
    "agg_sic_code",
    "dataset_code",
    "time_period_description",
    "note_ref",
    "year",
    "month",
    "uid",
];
const REFERENCE_COLUMNS: &[&str] = &[
    "agg_sic_code",
    "time_period_description",
    "note_ref",
    "sales_in_2022_mln",
    "percentage_weight",
];
const CONFLICT_COLUMNS: &[&str] = &[
    "type",
    "time_period_description",
    "kept_agg_sic_code",
    "dropped_agg_sic_code",
];
const UNMATCHED_COLUMNS: &[&str] = &[
    "sheet_name",
    "table_name",
    "dataset_code",
    "time_period_description",
];
const TABLE_COLUMNS: &[&str] = &["table_name", "table_code"];
const CONTENTS_COLUMNS: &[&str] = &["worksheet_number", "worksheet_description"];
const NOTES_COLUMNS: &[&str] = &["note_number", "note_text"];

/// Write `rows` under a fixed header line.
fn write_csv<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> ExportResult<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> ExportResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write the reconciled reference table and its conflict log.
pub fn export_reconciliation(dir: &Path, result: &Reconciliation) -> ExportResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let reference = dir.join(REFERENCE_FILE);
    write_csv::<ReferenceEntry>(&reference, REFERENCE_COLUMNS, &result.entries)?;

    let conflicts = dir.join(CONFLICTS_FILE);
    write_csv::<ConflictLogRecord>(&conflicts, CONFLICT_COLUMNS, &result.conflicts)?;

    Ok(vec![reference, conflicts])
}

/// Write every artifact of a run into `dir`, creating it if needed.
pub fn export_run(dir: &Path, output: &RunOutput) -> ExportResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let dataset = dir.join(DATASET_FILE);
    write_csv::<DatasetRow>(&dataset, DATASET_COLUMNS, &output.dataset.rows)?;
    written.push(dataset);

    written.extend(export_reconciliation(dir, &output.reconciliation)?);

    let unmatched = dir.join(UNMATCHED_FILE);
    write_csv::<UnmatchedRecord>(&unmatched, UNMATCHED_COLUMNS, &output.unmatched)?;
    written.push(unmatched);

    let tables = dir.join(TABLES_FILE);
    write_csv::<TableNameEntry>(&tables, TABLE_COLUMNS, &output.dataset.tables)?;
    written.push(tables);

    let contents = dir.join(CONTENTS_FILE);
    write_csv::<ListingEntry>(&contents, CONTENTS_COLUMNS, &output.contents)?;
    written.push(contents);

    let notes = dir.join(NOTES_FILE);
    write_csv::<ListingEntry>(&notes, NOTES_COLUMNS, &output.notes)?;
    written.push(notes);

    let summary = dir.join(SUMMARY_FILE);
    write_json::<RunSummary>(&summary, &output.summary)?;
    written.push(summary);

    for pass in &output.passes {
        let path = dir.join(data_file_name(&pass.name));
        write_csv::<DataRecord>(&path, PASS_COLUMNS, &pass.records)?;
        written.push(path);
    }

    for table in &output.categories {
        let path = dir.join(data_file_name(&table.name));
        write_csv::<CategoryRecord>(&path, CATEGORY_COLUMNS, &table.records)?;
        written.push(path);
    }

    Ok(written)
}
