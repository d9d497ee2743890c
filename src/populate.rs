//! Writing aggregated rows into the template.
//!
//! The populator owns a fixed set of cells per output row: the fixed-value
//! columns, the item column and every size-band column. Those cells are
//! cleared (value only, format kept) before writing; nothing else on the row
//! is read or changed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::aggregate::AggregatedRow;
use crate::cell_ref::format_cell_ref;
use crate::config::FixedValue;
use crate::error::{Result, SizegridError};
use crate::size_key::SizeKey;
use crate::styles::StyleBook;
use crate::template::{Anchors, SizeBand};
use crate::types::SheetDocument;

/// Per-run write options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulateOptions {
    /// Sheet row receiving the first aggregated row.
    pub first_row: u32,
    /// Write `0` instead of leaving zero-quantity cells empty.
    pub write_zeros: bool,
}

/// A size present in the input with no matching template column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedSize {
    pub key: SizeKey,
    pub items: Vec<String>,
    pub total_quantity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulateReport {
    pub rows_written: u32,
    pub unmapped: Vec<UnmappedSize>,
    /// Fractional quantities cut to integers on write.
    pub truncated_quantities: usize,
}

impl PopulateReport {
    /// Sheet rows that were written, if any.
    pub fn row_range(&self, first_row: u32) -> Option<std::ops::RangeInclusive<u32>> {
        (self.rows_written > 0).then(|| first_row..=first_row + self.rows_written - 1)
    }
}

/// Write `rows` below the header, one sheet row per item.
///
/// With `emphasis`, every written cell is switched to a bold variant of its
/// current format.
pub fn populate(
    sheet: &mut SheetDocument,
    rows: &[AggregatedRow],
    anchors: &Anchors,
    band: &SizeBand,
    options: PopulateOptions,
    mut emphasis: Option<&mut StyleBook>,
) -> Result<PopulateReport> {
    let owned = owned_columns(anchors, band);
    let mut report = PopulateReport::default();
    let mut unmapped: BTreeMap<&SizeKey, (BTreeSet<&str>, f64)> = BTreeMap::new();

    for (offset, item) in rows.iter().enumerate() {
        let row = u32::try_from(offset)
            .ok()
            .and_then(|o| options.first_row.checked_add(o))
            .ok_or_else(|| SizegridError::Parse(format!("too many output rows ({})", rows.len())))?;

        for &col in &owned {
            sheet.clear_value(row, col);
        }

        let mut written = Vec::with_capacity(anchors.fixed.len() + 1 + item.sizes.len());
        for fixed in &anchors.fixed {
            match &fixed.value {
                FixedValue::Integer(i) => sheet.set_integer(row, fixed.col, *i),
                FixedValue::Number(n) => sheet.set_number(row, fixed.col, *n),
                FixedValue::Text(t) => sheet.set_text(row, fixed.col, t),
            }
            written.push(fixed.col);
        }
        sheet.set_text(row, anchors.item_col, &item.item_id);
        written.push(anchors.item_col);

        for (key, &quantity) in &item.sizes {
            let Some(col) = band.column_for(key) else {
                let entry = unmapped.entry(key).or_default();
                entry.0.insert(item.item_id.as_str());
                entry.1 += quantity;
                continue;
            };
            let whole = quantity.trunc();
            if quantity.fract() != 0.0 {
                report.truncated_quantities += 1;
                tracing::debug!(
                    "Quantity {} for {} size {} truncated to {}",
                    quantity,
                    item.item_id,
                    key,
                    whole
                );
            }
            if whole == 0.0 && !options.write_zeros {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            sheet.set_integer(row, col, whole as i64);
            written.push(col);
        }

        if let Some(book) = emphasis.as_deref_mut() {
            for col in written {
                let current = sheet.cell(row, col).and_then(|c| c.style);
                if let Some(bold) = book.bold_variant(current) {
                    sheet.set_style(row, col, bold)?;
                }
            }
        }
        report.rows_written += 1;
    }

    report.unmapped = unmapped
        .into_iter()
        .map(|(key, (items, total_quantity))| {
            tracing::warn!(
                "Size '{}' has no template column; {} units across {} items not written",
                key,
                total_quantity,
                items.len()
            );
            UnmappedSize {
                key: key.clone(),
                items: items.into_iter().map(str::to_string).collect(),
                total_quantity,
            }
        })
        .collect();
    if report.truncated_quantities > 0 {
        tracing::warn!(
            "{} fractional quantities were truncated to whole units",
            report.truncated_quantities
        );
    }
    if report.rows_written > 0 {
        tracing::debug!(
            "Wrote {} rows starting at {}",
            report.rows_written,
            format_cell_ref(anchors.item_col, options.first_row)
        );
    }
    Ok(report)
}

fn owned_columns(anchors: &Anchors, band: &SizeBand) -> BTreeSet<u32> {
    anchors
        .fixed
        .iter()
        .map(|f| f.col)
        .chain(std::iter::once(anchors.item_col))
        .chain(band.columns())
        .collect()
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
    use crate::size_key::normalize_str;
    use crate::template::{FixedAnchor, SingleRow};
    use crate::types::{CellContent, CellValue};

    const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/></font></fonts><cellXfs count="2"><xf numFmtId="0" fontId="0"/><xf numFmtId="0" fontId="0" borderId="1"/></cellXfs></styleSheet>"#;

    fn template() -> SheetDocument {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="5"><c r="A5" t="inlineStr"><is><t>Sold To</t></is></c><c r="C5" t="inlineStr"><is><t>Material Number</t></is></c><c r="F5" t="inlineStr"><is><t>M</t></is></c><c r="G5" t="inlineStr"><is><t>L</t></is></c><c r="H5" t="inlineStr"><is><t>XL</t></is></c></row><row r="6"><c r="A6" s="1"/><c r="B6" t="inlineStr"><is><t>keep me</t></is></c><c r="C6" s="1"/><c r="F6" s="1"><v>99</v></c><c r="G6" s="1"/><c r="H6" s="1"/><c r="I6"><v>42</v></c></row><row r="7"><c r="F7" s="1"/></row></sheetData></worksheet>"#;
        crate::parser::parse_sheet_for_tests(xml, &StyleBook::default())
    }

    fn anchors() -> Anchors {
        Anchors {
            header_row: 5,
            item_col: 3,
            fixed: vec![FixedAnchor {
                label: "Sold To".into(),
                col: 1,
                value: FixedValue::Integer(0),
            }],
        }
    }

    fn row(item: &str, sizes: &[(&str, f64)]) -> AggregatedRow {
        AggregatedRow {
            item_id: item.into(),
            sizes: sizes.iter().map(|(k, q)| (normalize_str(k), *q)).collect(),
        }
    }

    fn options(write_zeros: bool) -> PopulateOptions {
        PopulateOptions {
            first_row: 6,
            write_zeros,
        }
    }

    #[test]
    fn test_writes_rows() {
        let mut sheet = template();
        let band = SizeBand::build(&sheet, 5, (6, 8), &SingleRow);
        let rows = [
            row("SKU1", &[("M", 5.0), ("L", 0.0)]),
            row("SKU2", &[("XL", 2.0)]),
        ];
        let report = populate(&mut sheet, &rows, &anchors(), &band, options(false), None).unwrap();

        assert_eq!(report.rows_written, 2);
        assert_eq!(sheet.value(6, 3), CellValue::Text("SKU1".into()));
        assert_eq!(sheet.value(6, 1), CellValue::Number(0.0));
        assert_eq!(sheet.value(6, 6), CellValue::Number(5.0));
        assert_eq!(sheet.value(6, 7), CellValue::Empty);
        assert_eq!(sheet.value(6, 8), CellValue::Empty);
        assert_eq!(sheet.value(7, 3), CellValue::Text("SKU2".into()));
        assert_eq!(sheet.value(7, 6), CellValue::Empty);
        assert_eq!(sheet.value(7, 8), CellValue::Number(2.0));
        assert_eq!(report.row_range(6), Some(6..=7));
    }

    #[test]
    fn test_ownership_isolation() {
        let mut sheet = template();
        let band = SizeBand::build(&sheet, 5, (6, 8), &SingleRow);
        populate(&mut sheet, &[row("SKU1", &[])], &anchors(), &band, options(false), None)
            .unwrap();

        // Owned band cell cleared but keeps its format
        let f6 = sheet.cell(6, 6).unwrap();
        assert_eq!(f6.content, CellContent::Blank);
        assert_eq!(f6.style, Some(1));
        // Cells outside the owned set are untouched
        assert_eq!(sheet.value(6, 2), CellValue::Text("keep me".into()));
        assert_eq!(sheet.value(6, 9), CellValue::Number(42.0));
        assert!(matches!(
            sheet.cell(6, 9).unwrap().content,
            CellContent::Raw { .. }
        ));
    }

    #[test]
    fn test_write_zeros_toggle() {
        let band_rows = [row("SKU1", &[("L", 0.0)])];

        let mut off = template();
        let band = SizeBand::build(&off, 5, (6, 8), &SingleRow);
        populate(&mut off, &band_rows, &anchors(), &band, options(false), None).unwrap();
        assert_eq!(off.value(6, 7), CellValue::Empty);

        let mut on = template();
        populate(&mut on, &band_rows, &anchors(), &band, options(true), None).unwrap();
        assert_eq!(on.cell(6, 7).unwrap().content, CellContent::Integer(0));
    }

    #[test]
    fn test_unmapped_and_truncated() {
        let mut sheet = template();
        let band = SizeBand::build(&sheet, 5, (6, 8), &SingleRow);
        let rows = [
            row("SKU1", &[("M", 2.7), ("XXL", 1.0)]),
            row("SKU2", &[("XXL", 3.0), ("S", 1.0)]),
        ];
        let report = populate(&mut sheet, &rows, &anchors(), &band, options(false), None).unwrap();

        assert_eq!(sheet.cell(6, 6).unwrap().content, CellContent::Integer(2));
        assert_eq!(report.truncated_quantities, 1);
        assert_eq!(report.unmapped.len(), 2);
        let xxl = report
            .unmapped
            .iter()
            .find(|u| u.key.as_str() == "XXL")
            .unwrap();
        assert_eq!(xxl.items, vec!["SKU1", "SKU2"]);
        assert_eq!(xxl.total_quantity, 4.0);
    }

    #[test]
    fn test_emphasis_uses_bold_variants() {
        let mut sheet = template();
        let mut book = StyleBook::parse("xl/styles.xml", STYLES.to_string()).unwrap();
        let band = SizeBand::build(&sheet, 5, (6, 8), &SingleRow);
        populate(
            &mut sheet,
            &[row("SKU1", &[("M", 1.0)])],
            &anchors(),
            &band,
            options(false),
            Some(&mut book),
        )
        .unwrap();

        let style = sheet.cell(6, 6).unwrap().style;
        assert_ne!(style, Some(1));
        assert!(book.is_bold(style));
        // Same source format maps to the same variant
        assert_eq!(sheet.cell(6, 3).unwrap().style, style);
        // Unwritten owned cells keep their format
        assert_eq!(sheet.cell(6, 7).unwrap().style, Some(1));
    }
}
