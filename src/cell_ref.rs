//! Utilities for Excel-style cell references and column letters.
//!
//! Rows and columns are 1-based throughout sizegrid, matching what an
//! operator sees in the spreadsheet (`A1` is `(1, 1)`).

use crate::error::{Result, SizegridError};

/// Convert a 1-based column index to letters (`1` -> `A`, `28` -> `AB`).
pub fn col_to_letter(col: u32) -> String {
    let mut result = Vec::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        // n % 26 < 26 always fits in a u8
        #[allow(clippy::cast_possible_truncation)]
        result.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    if result.is_empty() {
        result.push(b'A');
    }
    result.reverse();
    String::from_utf8_lossy(&result).into_owned()
}

/// Parse column letters like `AM` into a 1-based index.
pub fn letter_to_col(letters: &str) -> Result<u32> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return Err(SizegridError::CellRef(letters.to_string()));
    }
    let mut col: u32 = 0;
    for ch in trimmed.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(SizegridError::CellRef(letters.to_string()));
        }
        let upper = ch.to_ascii_uppercase();
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(upper as u32 - 'A' as u32 + 1))
            .ok_or_else(|| SizegridError::CellRef(letters.to_string()))?;
    }
    Ok(col)
}

/// Parse a cell reference like "A1" into (col, row), both 1-based.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Parse a cell reference from raw bytes (ASCII) into (col, row), both 1-based.
///
/// Bytes equivalent of [`parse_cell_ref`] for raw XML attribute values.
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() && !saw_row {
            let upper = b.to_ascii_uppercase();
            col = col.saturating_mul(26).saturating_add(u32::from(upper - b'A') + 1);
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((col, row))
}

/// Format a (col, row) pair as `A1`.
pub fn format_cell_ref(col: u32, row: u32) -> String {
    format!("{}{}", col_to_letter(col), row)
}

/// A rectangular range with 1-based inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl CellRange {
    /// Parse `A1:B10` or a single `A1`.
    pub fn parse(range: &str) -> Option<Self> {
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (start_col, start_row) = parse_cell_ref(start)?;
        let (end_col, end_row) = parse_cell_ref(end)?;
        Some(Self {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    pub fn contains_row(&self, row: u32) -> bool {
        (self.start_row..=self.end_row).contains(&row)
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            format_cell_ref(self.start_col, self.start_row),
            format_cell_ref(self.end_col, self.end_row)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters_roundtrip() {
        assert_eq!(col_to_letter(1), "A");
        assert_eq!(col_to_letter(26), "Z");
        assert_eq!(col_to_letter(27), "AA");
        assert_eq!(col_to_letter(39), "AM");
        assert_eq!(col_to_letter(122), "DR");
        assert_eq!(letter_to_col("AM").unwrap(), 39);
        assert_eq!(letter_to_col("dr").unwrap(), 122);
    }

    #[test]
    fn test_letter_to_col_rejects_garbage() {
        assert!(letter_to_col("").is_err());
        assert!(letter_to_col("A1").is_err());
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("$C$5"), Some((3, 5)));
        assert_eq!(parse_cell_ref("AM12"), Some((39, 12)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("1A"), None);
    }

    #[test]
    fn test_range_parse_and_display() {
        let range = CellRange::parse("A5:DR40").unwrap();
        assert_eq!(range.start_row, 5);
        assert_eq!(range.end_col, 122);
        assert!(range.contains_row(5));
        assert!(!range.contains_row(41));
        assert_eq!(range.to_string(), "A5:DR40");

        let single = CellRange::parse("B2").unwrap();
        assert_eq!(single.to_string(), "B2:B2");
    }
}
