//! Transformation module.
//!
//! This module turns extracted records into the final dataset:
//! - Assemble: year/month derivation, table codes, unique ids
//! - Pipeline: Main extraction pipeline

pub mod assemble;
pub mod pipeline;

pub use assemble::{assemble, Assembled, DatasetRow, TableNameEntry};
pub use pipeline::*;
