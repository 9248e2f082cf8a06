//! Error types for the extraction pipeline.
//!
//! Errors are split by the stage that raises them:
//!
//! - [`CsvError`] - delimited file parsing (overrides, reference fragments, series)
//! - [`WorkbookError`] - opening and reading workbook sheets
//! - [`HeaderError`] - structural problems inside a single table block
//! - [`ListingError`] - structural problems in listing sheets and category tables
//! - [`PlanError`] - invalid extraction plans
//! - [`ExportError`] - writing output artifacts
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Block- and listing-level errors are recovered from inside the pipeline
//! (the block or listing is skipped and a warning logged). Only
//! [`PipelineError`] escapes to the caller; [`ExportError`] is returned by the
//! exporter on its own.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading delimited input files.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed row.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("File is empty")]
    EmptyFile,

    /// Required column missing from the header row.
    #[error("Missing column '{0}' in header")]
    MissingColumn(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors while opening or reading a workbook.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// The workbook file could not be opened.
    #[error("Failed to open workbook: {0}")]
    Open(#[from] calamine::Error),

    /// A sheet exists but its cells could not be read.
    #[error("Failed to read sheet '{sheet}': {message}")]
    SheetRead { sheet: String, message: String },

    /// An expected sheet is not present at all.
    #[error("Worksheet '{0}' not found in workbook")]
    MissingSheet(String),
}

// =============================================================================
// Block Errors
// =============================================================================

/// Structural errors within one table block.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The field that keys column mappings is absent from the header rows.
    #[error("Block '{table}' on sheet '{sheet}' has no '{field}' header row")]
    MissingKeyField {
        sheet: String,
        table: String,
        field: String,
    },

    /// The block ends before its header does.
    #[error("Block '{table}' on sheet '{sheet}' has {available} rows, header needs {needed}")]
    TruncatedHeader {
        sheet: String,
        table: String,
        available: usize,
        needed: usize,
    },
}

/// Structural errors in listing sheets (Contents, Notes) and category tables.
#[derive(Debug, Error)]
pub enum ListingError {
    /// No row carries both expected header labels.
    #[error("Sheet '{sheet}' has no header row with '{key_label}' and '{value_label}'")]
    HeaderNotFound {
        sheet: String,
        key_label: String,
        value_label: String,
    },

    /// No cell carries the category column label.
    #[error("Sheet '{sheet}' has no '{label}' header cell")]
    LabelNotFound { sheet: String, label: String },
}

// =============================================================================
// Plan Errors
// =============================================================================

/// Errors in an extraction plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Plan file could not be read.
    #[error("Failed to read plan: {0}")]
    Io(#[from] std::io::Error),

    /// Plan JSON could not be parsed.
    #[error("Invalid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A sheet pattern is not a valid regex.
    #[error("Pass '{pass}' has an invalid sheet pattern: {message}")]
    InvalidPattern { pass: String, message: String },

    /// Two passes share a name.
    #[error("Duplicate pass name: {0}")]
    DuplicatePass(String),

    /// A description-lookup pass points at a pass that does not run before it.
    #[error("Pass '{pass}' looks up codes in '{reference}', which is not an earlier pass")]
    UnknownReferencePass { pass: String, reference: String },

    /// The header convention cannot produce the key field.
    #[error("Pass '{pass}': {message}")]
    InvalidHeader { pass: String, message: String },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing output artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem error.
    #[error("Export IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("Export CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("Export JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_pipeline`].
/// Everything in here aborts the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Delimited input error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Workbook error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Plan error.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for workbook operations.
pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// Result type for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
