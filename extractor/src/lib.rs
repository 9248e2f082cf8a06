//! # rsi-extract - Retail Sales Index workbook extraction
//!
//! Turns the Retail Sales Index "main reference tables" workbook into a
//! long-format time series dataset and a reconciled code reference table.
//! Sheets hold several tables each, with multi-row headers that are resolved
//! by label matching.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Workbook   │────▶│   Extract   │────▶│  Reference  │────▶│  Transform  │────▶│   Export    │
//! │ (calamine)  │     │ (per pass)  │     │ (reconcile, │     │ (assemble)  │     │ (CSV, JSON) │
//! └─────────────┘     └─────────────┘     │  backfill)  │     └─────────────┘     └─────────────┘
//!                                          └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rsi_extract::{export_run, run_pipeline, ExtractionPlan, RunInputs, Workbook};
//! use std::path::Path;
//!
//! let workbook = Workbook::open(Path::new("mainreferencetables.xlsx"))?;
//! let output = run_pipeline(&workbook, &ExtractionPlan::default(), RunInputs::default())?;
//! export_run(Path::new("cleansed"), &output)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (SheetGrid, TableBlock, DataRecord, ReferenceEntry)
//! - [`plan`] - Declarative extraction plan
//! - [`workbook`] - Workbook loading
//! - [`extract`] - Block segmentation, header resolution, row and category extraction
//! - [`reference`] - Reference reconciliation and code backfill
//! - [`parser`] - Override, reference and series CSV inputs
//! - [`transform`] - Dataset assembly and pipeline
//! - [`export`] - Output artifacts
//! - [`logs`] - Logging setup

// Core modules
pub mod error;
pub mod logs;
pub mod models;
pub mod plan;

// Inputs
pub mod parser;
pub mod workbook;

// Extraction and reconciliation
pub mod extract;
pub mod reference;

// Transformation
pub mod transform;

// Output
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, ExportError, HeaderError, ListingError, PipelineError, PipelineResult, PlanError,
    WorkbookError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CategoryRecord, ColumnMapping, ConflictLogRecord, ConflictType, DataRecord, Frequency,
    ListingEntry, ReferenceEntry, ReferenceFragment, SheetGrid, TableBlock, UnmatchedRecord,
};

// =============================================================================
// Re-exports - Plan
// =============================================================================

pub use plan::{
    CategoryTableSpec, CodeSource, DataOffset, ExtractionPlan, HeaderConvention, HeaderField,
    LabelDictionary, PassSpec,
};

// =============================================================================
// Re-exports - Extraction
// =============================================================================

pub use extract::{
    build_mappings, clean_text, extract_category_table, extract_listing, extract_rows,
    resolve_layout, run_category_table, run_pass, segment_sheet, HeaderLayout, PassOutput,
};

// =============================================================================
// Re-exports - Reference
// =============================================================================

pub use reference::{backfill_codes, reconcile, BackfillOutcome, CodeLookup, Reconciliation};

// =============================================================================
// Re-exports - Inputs
// =============================================================================

pub use parser::{read_overrides, read_reference_csv, read_series, SeriesData};
pub use workbook::Workbook;

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    reconcile_files, run_pipeline, Assembled, CategoryData, DatasetRow, PassData, RunInputs,
    RunOutput, RunSummary,
};

pub use export::{export_reconciliation, export_run};
