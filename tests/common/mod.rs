//! Read-back helpers for filled workbooks.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::io::{Cursor, Read};

use sizegrid::cell_ref::parse_cell_ref;
use sizegrid::{CellValue, InputRecord, RawSize, SheetDocument, TemplateConfig, Workbook};

// Re-export fixtures for convenience
pub use super::fixtures::*;

/// Open XLSX bytes and load the active sheet.
pub fn reopen(bytes: &[u8]) -> (Workbook, SheetDocument) {
    let workbook = Workbook::open(bytes.to_vec()).expect("output opens");
    let sheet = workbook
        .load_sheet(workbook.active_sheet_index())
        .expect("active sheet loads");
    (workbook, sheet)
}

fn at(cell_ref: &str) -> (u32, u32) {
    let (col, row) = parse_cell_ref(cell_ref).expect("valid cell reference");
    (row, col)
}

pub fn value_at(sheet: &SheetDocument, cell_ref: &str) -> CellValue {
    let (row, col) = at(cell_ref);
    sheet.value(row, col)
}

pub fn style_at(sheet: &SheetDocument, cell_ref: &str) -> Option<u32> {
    let (row, col) = at(cell_ref);
    sheet.cell(row, col).and_then(|c| c.style)
}

#[track_caller]
pub fn assert_number(sheet: &SheetDocument, cell_ref: &str, expected: f64) {
    assert_eq!(
        value_at(sheet, cell_ref),
        CellValue::Number(expected),
        "cell {cell_ref}"
    );
}

#[track_caller]
pub fn assert_text(sheet: &SheetDocument, cell_ref: &str, expected: &str) {
    assert_eq!(
        value_at(sheet, cell_ref),
        CellValue::Text(expected.to_string()),
        "cell {cell_ref}"
    );
}

#[track_caller]
pub fn assert_empty(sheet: &SheetDocument, cell_ref: &str) {
    assert_eq!(value_at(sheet, cell_ref), CellValue::Empty, "cell {cell_ref}");
}

/// Decompressed contents of one package part.
pub fn zip_part(bytes: &[u8], path: &str) -> Option<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(path).ok()?;
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    Some(out)
}

pub fn zip_part_text(bytes: &[u8], path: &str) -> String {
    String::from_utf8(zip_part(bytes, path).unwrap_or_else(|| panic!("missing part {path}")))
        .unwrap()
}

/// Part names in archive order.
pub fn zip_part_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index_raw(i).unwrap().name().to_string())
        .collect()
}

pub fn records(rows: &[(&str, &str, f64)]) -> Vec<InputRecord> {
    rows.iter()
        .map(|(item, size, qty)| InputRecord::new(*item, *size, *qty))
        .collect()
}

pub fn record(item: &str, size: RawSize, qty: f64) -> InputRecord {
    InputRecord {
        item_id: item.to_string(),
        raw_size: size,
        quantity: qty,
    }
}

/// Configuration matching [`order_template`].
pub fn order_config() -> TemplateConfig {
    TemplateConfig::from_toml(
        r#"
header_marker = "Material Number"
item_column = "Material Number"
emphasize_values = false

[[fixed_columns]]
label = "Sold To"
value = 0

[size_band]
start = "F"
end = "H"
"#,
    )
    .unwrap()
}
