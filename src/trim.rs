//! Hiding empty size columns at the edges of the band.

use std::ops::RangeInclusive;

use serde::Serialize;

use crate::cell_ref::col_to_letter;
use crate::types::SheetDocument;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrimReport {
    /// Columns hidden by this pass, left to right.
    pub hidden: Vec<u32>,
}

/// Hide the leading and trailing band columns that hold no nonzero number in
/// `rows`.
///
/// Columns between the first and last nonzero column keep whatever visibility
/// they had. When no band column has a nonzero value nothing is hidden.
pub fn trim(sheet: &mut SheetDocument, (start, end): (u32, u32), rows: RangeInclusive<u32>) -> TrimReport {
    let has_value = |col: u32| {
        rows.clone().any(|row| {
            sheet
                .cell(row, col)
                .and_then(|c| c.numeric_value())
                .is_some_and(|n| n != 0.0)
        })
    };

    let Some(first) = (start..=end).find(|&col| has_value(col)) else {
        tracing::debug!("No quantities in band; column visibility unchanged");
        return TrimReport::default();
    };
    let last = (first..=end).rev().find(|&col| has_value(col)).unwrap_or(first);

    let hidden: Vec<u32> = (start..first).chain(last + 1..=end).collect();
    for &col in &hidden {
        sheet.hide_column(col);
    }

    tracing::debug!(
        "Visible size range {}:{}, hid {} columns",
        col_to_letter(first),
        col_to_letter(last),
        hidden.len()
    );
    TrimReport { hidden }
}
