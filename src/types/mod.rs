//! In-memory model of the worksheet being filled.

mod cell;
mod sheet;

pub use cell::*;
pub use sheet::*;
