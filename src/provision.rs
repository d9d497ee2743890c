//! Row capacity below the header.
//!
//! Templates ship with a fixed number of pre-formatted rows. When an order
//! has more items than that, new rows are appended after the last existing
//! row, copying height and per-cell formats from a reference row so they look
//! like the rest of the grid.

use crate::config::CapacityPolicy;
use crate::error::{Result, SizegridError};
use crate::types::SheetDocument;

/// Make sure rows `first_output_row ..first_output_row + row_count` exist.
///
/// New rows are styled like `style_source_row`, or like the nearest data row
/// above it. Rows at or above `header_row` are never used as a source; with
/// no data row to copy, new rows are blank. Returns the number of rows
/// appended. Existing rows are never renumbered or replaced.
pub fn ensure_capacity(
    sheet: &mut SheetDocument,
    header_row: u32,
    style_source_row: u32,
    first_output_row: u32,
    row_count: u32,
    policy: CapacityPolicy,
) -> Result<u32> {
    if row_count == 0 {
        return Ok(0);
    }
    let last_needed = first_output_row.saturating_add(row_count - 1);
    let available = sheet.max_row();
    if available >= last_needed {
        return Ok(0);
    }

    if policy == CapacityPolicy::Strict {
        return Err(SizegridError::Capacity {
            needed: last_needed,
            available,
        });
    }

    let template_row = reference_row(sheet, header_row, style_source_row)
        .map(|row| row.styled_copy(sheet.max_col()))
        .unwrap_or_default();

    let first_new = available + 1;
    let mut appended = 0;
    for row in first_new..=last_needed {
        if sheet.insert_row(row, template_row.clone()) {
            appended += 1;
        }
    }

    tracing::debug!(
        "Appended rows {}..={} styled like row {}",
        first_new,
        last_needed,
        style_source_row
    );
    Ok(appended)
}

/// The source row, or the nearest data row above it when the source is absent.
fn reference_row(
    sheet: &SheetDocument,
    header_row: u32,
    source_row: u32,
) -> Option<&crate::types::RowEntry> {
    let first_data_row = header_row.checked_add(1)?;
    if source_row < first_data_row {
        return None;
    }
    sheet
        .rows
        .range(first_data_row..=source_row)
        .next_back()
        .map(|(_, row)| row)
}
