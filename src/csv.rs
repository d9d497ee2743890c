//! CSV/TSV input as rows of text fields.
//!
//! Fields stay text: item ids such as `00123` must keep their leading zeros,
//! and sizes are normalized from text anyway.

use csv::ReaderBuilder;

use crate::error::Result;

/// Delimiter for parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Parse CSV/TSV bytes into rows of fields, header row included.
///
/// Quoted fields may contain delimiters, doubled quotes and line breaks.
/// Rows may differ in length. Blank rows are skipped, invalid UTF-8 is
/// replaced rather than rejected, and a leading byte-order mark is dropped.
pub fn parse_delimited(data: &[u8], delim: Delimiter) -> Result<Vec<Vec<String>>> {
    let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
    let mut reader = ReaderBuilder::new()
        .delimiter(delim.as_byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let fields: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(fields);
    }
    Ok(rows)
}
