//! Reading the order data file into [`InputRecord`]s.
//!
//! Accepted formats are `.xlsx` (active sheet, first row as headers), `.csv`
//! and `.tsv`. The header row must name the columns `index`, `size` and `qty`.

use std::path::Path;

use crate::csv::{parse_delimited, Delimiter};
use crate::error::{Result, SizegridError};
use crate::parser::Workbook;
use crate::size_key::RawSize;
use crate::types::CellValue;

/// Column headers every input file must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["index", "size", "qty"];

/// One data row: an item, a size as written, and a quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub item_id: String,
    pub raw_size: RawSize,
    pub quantity: f64,
}

impl InputRecord {
    pub fn new(item_id: impl Into<String>, raw_size: impl Into<RawSize>, quantity: f64) -> Self {
        Self {
            item_id: item_id.into(),
            raw_size: raw_size.into(),
            quantity,
        }
    }
}

/// Input file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xlsx,
    Csv,
    Tsv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" => Ok(InputFormat::Xlsx),
            "csv" => Ok(InputFormat::Csv),
            "tsv" | "tab" => Ok(InputFormat::Tsv),
            _ => Err(SizegridError::UnsupportedInput(path.display().to_string())),
        }
    }
}

/// Read and validate an input file.
pub fn read_input(path: &Path) -> Result<Vec<InputRecord>> {
    let format = InputFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let records = read_input_bytes(bytes, format)?;
    tracing::info!("Read {} input rows from {}", records.len(), path.display());
    Ok(records)
}

/// Read input already loaded into memory.
pub fn read_input_bytes(bytes: Vec<u8>, format: InputFormat) -> Result<Vec<InputRecord>> {
    let rows: Vec<Vec<CellValue>> = match format {
        InputFormat::Xlsx => xlsx_rows(bytes)?,
        InputFormat::Csv | InputFormat::Tsv => {
            let delim = if format == InputFormat::Csv {
                Delimiter::Comma
            } else {
                Delimiter::Tab
            };
            parse_delimited(&bytes, delim)?
                .into_iter()
                .map(|fields| fields.into_iter().map(CellValue::Text).collect())
                .collect()
        }
    };
    records_from_rows(rows)
}

/// Rows of the active sheet, dense from column 1, starting at the first row
/// present.
fn xlsx_rows(bytes: Vec<u8>) -> Result<Vec<Vec<CellValue>>> {
    let workbook = Workbook::open(bytes)?;
    let sheet = workbook.load_sheet(workbook.active_sheet_index())?;
    let rows = sheet
        .rows
        .values()
        .map(|row| {
            let width = row.cells.keys().next_back().copied().unwrap_or(0);
            (1..=width)
                .map(|col| {
                    row.cells
                        .get(&col)
                        .map_or(CellValue::Empty, crate::types::CellEntry::value)
                })
                .collect()
        })
        .collect();
    Ok(rows)
}

fn records_from_rows(rows: Vec<Vec<CellValue>>) -> Result<Vec<InputRecord>> {
    let mut rows = rows.into_iter();
    let header: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|v| v.display_text().trim().to_string())
        .collect();

    let position = |name: &str| header.iter().position(|h| h == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| position(name).is_none())
        .map(|name| (*name).to_string())
        .collect();
    let (Some(item_idx), Some(size_idx), Some(qty_idx)) =
        (position("index"), position("size"), position("qty"))
    else {
        return Err(SizegridError::MissingInputColumns(missing));
    };

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        let item_id = row
            .get(item_idx)
            .map(CellValue::display_text)
            .unwrap_or_default()
            .trim()
            .to_string();
        if item_id.is_empty() {
            tracing::debug!("Skipping data row {} with a blank index", offset + 1);
            continue;
        }
        let raw_size = row.get(size_idx).map_or(RawSize::Missing, CellValue::to_raw_size);
        let quantity = row.get(qty_idx).map_or(0.0, quantity_of);
        records.push(InputRecord {
            item_id,
            raw_size,
            quantity,
        });
    }
    Ok(records)
}

/// Quantity of a cell; blank or non-numeric reads as zero.
fn quantity_of(value: &CellValue) -> f64 {
    match value {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => {
            let text = s.trim();
            match text.parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => {
                    if !text.is_empty() {
                        tracing::debug!("Non-numeric quantity '{}' read as 0", text);
                    }
                    0.0
                }
            }
        }
        _ => 0.0,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            InputFormat::from_path(Path::new("orders.XLSX")).unwrap(),
            InputFormat::Xlsx
        );
        assert_eq!(
            InputFormat::from_path(Path::new("a/b.csv")).unwrap(),
            InputFormat::Csv
        );
        assert!(matches!(
            InputFormat::from_path(Path::new("orders.xls")),
            Err(SizegridError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_csv_records() {
        let data = b"qty,index,size,note\n3,00123,7.5,x\n,00123,8,\n2,,9,\nabc,SKU2, XL ,\n";
        let records = read_input_bytes(data.to_vec(), InputFormat::Csv).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], InputRecord::new("00123", "7.5", 3.0));
        assert_eq!(records[1].quantity, 0.0);
        assert_eq!(records[2].item_id, "SKU2");
        assert_eq!(records[2].raw_size, RawSize::Text(" XL ".into()));
        assert_eq!(records[2].quantity, 0.0);
    }

    #[test]
    fn test_missing_columns_listed() {
        let err = read_input_bytes(b"index,Size,quantity\nA,1,2".to_vec(), InputFormat::Csv)
            .unwrap_err();
        assert!(
            matches!(err, SizegridError::MissingInputColumns(ref cols) if cols == &["size", "qty"]),
            "unexpected {err:?}"
        );
    }

    #[test]
    fn test_empty_input_reports_all_columns() {
        let err = read_input_bytes(Vec::new(), InputFormat::Tsv).unwrap_err();
        assert!(
            matches!(err, SizegridError::MissingInputColumns(ref cols) if cols.len() == 3)
        );
    }

    #[test]
    fn test_blank_size_is_missing() {
        let records =
            read_input_bytes(b"index\tsize\tqty\nA\t\t2".to_vec(), InputFormat::Tsv).unwrap();
        assert_eq!(records[0].raw_size, RawSize::Missing);
    }
}
