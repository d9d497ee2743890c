//! Locating the anchors of a template: the header row, the named columns and
//! the size band.

use std::collections::BTreeMap;

use crate::cell_ref::col_to_letter;
use crate::config::{HeaderStrategyKind, TemplateConfig};
use crate::error::{Result, SizegridError};
use crate::size_key::{normalize, RawSize, SizeKey};
use crate::types::{CellValue, SheetDocument};

/// Find the first row within `1..=max_scan_rows` holding a cell whose trimmed
/// text equals `marker`.
pub fn locate_header_row(sheet: &SheetDocument, marker: &str, max_scan_rows: u32) -> Result<u32> {
    let marker = marker.trim();
    sheet
        .rows
        .range(1..=max_scan_rows)
        .find(|(_, row)| {
            row.cells
                .values()
                .any(|cell| cell.value().display_text().trim() == marker)
        })
        .map(|(&row, _)| row)
        .ok_or_else(|| SizegridError::HeaderNotFound {
            marker: marker.to_string(),
            scanned: max_scan_rows,
        })
}

/// Non-empty header labels of `row`, trimmed, in column order.
pub fn header_labels(sheet: &SheetDocument, row: u32) -> Vec<(u32, String)> {
    sheet.row(row).map_or_else(Vec::new, |r| {
        r.cells
            .iter()
            .map(|(&col, cell)| (col, cell.value().display_text().trim().to_string()))
            .filter(|(_, label)| !label.is_empty())
            .collect()
    })
}

/// Column whose header equals `label` exactly (trimmed). First match wins.
pub fn resolve_column(headers: &[(u32, String)], label: &str) -> Result<u32> {
    let label = label.trim();
    headers
        .iter()
        .find(|(_, text)| text == label)
        .map(|(col, _)| *col)
        .ok_or_else(|| SizegridError::ColumnNotFound(label.to_string()))
}

/// How the label of a size-band column is read.
pub trait HeaderStrategy {
    fn label(&self, sheet: &SheetDocument, col: u32, header_row: u32) -> RawSize;
}

/// The header row cell only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRow;

impl HeaderStrategy for SingleRow {
    fn label(&self, sheet: &SheetDocument, col: u32, header_row: u32) -> RawSize {
        sheet.value(header_row, col).to_raw_size()
    }
}

/// Letter sizes recognised when choosing between stacked header rows.
const LETTER_SIZES: &[&str] = &[
    "XXS", "XS", "S", "M", "L", "XL", "XXL", "XXXL", "2XL", "3XL", "4XL", "5XL", "OS",
];

/// Header row plus the row directly above it.
///
/// Some templates put a group caption ("Sizes", "EU") on one row and the size
/// itself on the other. The candidate that looks like a size (contains a digit
/// or is a letter size) wins; otherwise the first non-empty one.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackedRows;

impl StackedRows {
    fn looks_like_size(value: &CellValue) -> bool {
        match value {
            CellValue::Number(_) | CellValue::Date { .. } => true,
            other => {
                let text = other.display_text();
                let upper = text.trim().to_uppercase();
                upper.chars().any(|c| c.is_ascii_digit()) || LETTER_SIZES.contains(&upper.as_str())
            }
        }
    }
}

impl HeaderStrategy for StackedRows {
    fn label(&self, sheet: &SheetDocument, col: u32, header_row: u32) -> RawSize {
        let mut candidates = vec![sheet.value(header_row, col)];
        if header_row > 1 {
            candidates.push(sheet.value(header_row - 1, col));
        }
        candidates.retain(|v| v.to_raw_size() != RawSize::Missing);

        candidates
            .iter()
            .find(|v| Self::looks_like_size(v))
            .or_else(|| candidates.first())
            .map_or(RawSize::Missing, CellValue::to_raw_size)
    }
}

impl HeaderStrategyKind {
    pub fn strategy(self) -> Box<dyn HeaderStrategy> {
        match self {
            HeaderStrategyKind::SingleRow => Box::new(SingleRow),
            HeaderStrategyKind::StackedRows => Box::new(StackedRows),
        }
    }
}

/// The contiguous size columns and the size key each one stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBand {
    pub start: u32,
    pub end: u32,
    pub keys: BTreeMap<SizeKey, u32>,
}

impl SizeBand {
    /// Read the band's labels; empty labels are skipped, the first column
    /// wins for a duplicated key.
    pub fn build(
        sheet: &SheetDocument,
        header_row: u32,
        (start, end): (u32, u32),
        strategy: &dyn HeaderStrategy,
    ) -> Self {
        let mut keys = BTreeMap::new();
        for col in start..=end {
            let key = normalize(&strategy.label(sheet, col, header_row));
            if key.is_empty() {
                continue;
            }
            if let Some(&first) = keys.get(&key) {
                tracing::debug!(
                    "Size '{}' repeated in column {}; keeping column {}",
                    key,
                    col_to_letter(col),
                    col_to_letter(first)
                );
                continue;
            }
            keys.insert(key, col);
        }
        Self { start, end, keys }
    }

    pub fn column_for(&self, key: &SizeKey) -> Option<u32> {
        self.keys.get(key).copied()
    }

    pub fn columns(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// A named column that receives one constant value.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedAnchor {
    pub label: String,
    pub col: u32,
    pub value: crate::config::FixedValue,
}

/// Every column position the fill writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchors {
    pub header_row: u32,
    pub item_col: u32,
    pub fixed: Vec<FixedAnchor>,
}

/// Resolve header row, item column and fixed-value columns.
pub fn resolve_anchors(sheet: &SheetDocument, config: &TemplateConfig) -> Result<Anchors> {
    let header_row = locate_header_row(sheet, &config.header_marker, config.max_scan_rows)?;
    let headers = header_labels(sheet, header_row);
    let item_col = resolve_column(&headers, &config.item_column)?;
    let fixed = config
        .fixed_columns
        .iter()
        .map(|fc| {
            Ok(FixedAnchor {
                label: fc.label.clone(),
                col: resolve_column(&headers, &fc.label)?,
                value: fc.value.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Header row {}, item column {}",
        header_row,
        col_to_letter(item_col)
    );
    Ok(Anchors {
        header_row,
        item_col,
        fixed,
    })
}
