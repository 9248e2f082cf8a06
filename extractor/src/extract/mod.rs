//! Sheet-level extraction: from a raw grid to data records and reference rows.
//!
//! ```text
//! SheetGrid ─► segment ─► TableBlock ─► header ─► ColumnMapping ─► rows ─► DataRecord
//!                                                      │
//!                                                   derive (description lookup passes)
//! ```

pub mod category;
pub mod derive;
pub mod header;
pub mod listing;
pub mod pass;
pub mod rows;
pub mod segment;
pub mod text;

pub use category::{extract_category_table, run_category_table};
pub use derive::{derive_codes, split_size_suffix, DescriptionIndex};
pub use header::{build_mappings, resolve_layout, HeaderLayout};
pub use listing::{append_unique, extract_listing, CONTENTS_LABELS, NOTES_LABELS};
pub use pass::{run_pass, PassOutput};
pub use rows::extract_rows;
pub use segment::segment_sheet;
pub use text::{clean_text, coerce_number};
