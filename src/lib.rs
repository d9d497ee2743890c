//! sizegrid - fills size-grid order templates (XLSX)
//!
//! Reads item / size / quantity rows, sums them per item and size, and writes
//! the totals into a pre-formatted order template:
//! - Size labels normalized across spellings (`7.5`, `7,5`, a date-mangled `7.5`)
//! - Header row and columns located by label, size band by configured letters
//! - Extra rows styled like the template's own
//! - Leading and trailing empty size columns hidden
//! - Every package part the fill does not own copied byte for byte
//!
//! # Usage
//!
//! ```no_run
//! use sizegrid::{fill_template, read_input, TemplateConfig};
//! use std::path::Path;
//!
//! # fn main() -> sizegrid::Result<()> {
//! let config = TemplateConfig::default();
//! let records = read_input(Path::new("orders.csv"))?;
//! let template = std::fs::read("template.xlsx")?;
//! let outcome = fill_template(&template, &records, &config)?;
//! std::fs::write("orders_FILLED.xlsx", outcome.bytes)?;
//! # Ok(())
//! # }
//! ```

// Package model
pub mod cell_ref;
pub mod error;
pub mod numfmt;
pub mod parser;
pub mod styles;
pub mod tables;
pub mod types;
pub mod xml_helpers;

mod export;

// Fill pipeline
pub mod aggregate;
pub mod config;
pub mod csv;
pub mod fill;
pub mod input;
pub mod populate;
pub mod provision;
pub mod size_key;
pub mod template;
pub mod trim;

pub use aggregate::{aggregate, AggregatedRow};
pub use config::{load_config, CapacityPolicy, ItemOrder, TemplateConfig};
pub use error::{Result, SizegridError};
pub use fill::{fill_template, FillOutcome, FillReport};
pub use input::{read_input, read_input_bytes, InputFormat, InputRecord};
pub use parser::Workbook;
pub use size_key::{normalize, normalize_str, RawSize, SizeKey};
pub use types::*;

/// Get the version of sizegrid
#[must_use]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
