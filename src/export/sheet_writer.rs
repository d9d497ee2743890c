//! Re-serializes a `SheetDocument` into worksheet XML.
//!
//! Only the regenerated regions (`<dimension>`, `<cols>`, `<sheetData>` and
//! the sheet auto-filter's opening tag) are written; the rest of the source
//! XML is spliced through unchanged. Written strings use inline strings
//! (`t="inlineStr"`) so the shared string table never needs rebuilding.

use std::fmt::Write as _;
use std::ops::Range;

use crate::cell_ref::{format_cell_ref, CellRange};
use crate::error::Result;
use crate::types::{format_plain_number, CellContent, CellEntry, ColSpec, RowEntry, SheetDocument};
use crate::xml_helpers::{apply_edits, push_raw_attrs, set_raw_attr, xml_escape};

/// Write a complete worksheet XML string from a `SheetDocument`.
pub(crate) fn write_sheet_xml(sheet: &SheetDocument) -> Result<String> {
    let p = sheet.prefix.as_str();
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();

    if let Some(span) = &sheet.layout.dimension {
        edits.push((span.clone(), dimension_xml(sheet)));
    }

    let cols = cols_xml(p, &sheet.cols);
    match &sheet.layout.cols {
        Some(span) => edits.push((span.clone(), cols)),
        None if !sheet.cols.is_empty() => {
            let at = sheet.layout.sheet_data.start;
            edits.push((at..at, cols));
        }
        None => {}
    }

    edits.push((sheet.layout.sheet_data.clone(), sheet_data_xml(p, sheet)));

    if let Some(filter) = &sheet.auto_filter {
        let qname = format!("{p}autoFilter");
        let mut attrs = filter.attrs.clone();
        set_raw_attr(&mut attrs, "ref", filter.range.to_string());
        let mut tag = format!("<{qname}");
        push_raw_attrs(&mut tag, &attrs);
        tag.push_str(if filter.self_closing { "/>" } else { ">" });
        edits.push((filter.span.clone(), tag));
    }

    Ok(apply_edits(&sheet.xml, edits))
}

fn dimension_xml(sheet: &SheetDocument) -> String {
    let max_row = sheet.max_row();
    let max_col = sheet.max_col();
    let reference = if max_row == 0 || max_col == 0 {
        "A1".to_string()
    } else {
        CellRange {
            start_col: 1,
            start_row: 1,
            end_col: max_col,
            end_row: max_row,
        }
        .to_string()
    };
    format!("<{}dimension ref=\"{reference}\"/>", sheet.prefix)
}

fn cols_xml(p: &str, cols: &[ColSpec]) -> String {
    if cols.is_empty() {
        return String::new();
    }
    let mut out = format!("<{p}cols>");
    for col in cols {
        let _ = write!(out, "<{p}col min=\"{}\" max=\"{}\"", col.min, col.max);
        push_raw_attrs(&mut out, &col.attrs);
        out.push_str("/>");
    }
    let _ = write!(out, "</{p}cols>");
    out
}

fn sheet_data_xml(p: &str, sheet: &SheetDocument) -> String {
    if sheet.rows.is_empty() {
        return format!("<{p}sheetData/>");
    }
    let mut out = String::with_capacity(sheet.layout.sheet_data.len() + 1024);
    let _ = write!(out, "<{p}sheetData>");
    for (&row, entry) in &sheet.rows {
        write_row(&mut out, p, row, entry);
    }
    let _ = write!(out, "</{p}sheetData>");
    out
}

fn write_row(out: &mut String, p: &str, row: u32, entry: &RowEntry) {
    let _ = write!(out, "<{p}row r=\"{row}\"");
    push_raw_attrs(out, &entry.attrs);
    if entry.cells.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for (&col, cell) in &entry.cells {
        write_cell(out, p, row, col, cell);
    }
    let _ = write!(out, "</{p}row>");
}

/// Write a single `<c>` element.
fn write_cell(out: &mut String, p: &str, row: u32, col: u32, cell: &CellEntry) {
    if let CellContent::Raw { xml, .. } = &cell.content {
        out.push_str(xml);
        return;
    }

    let _ = write!(out, "<{p}c r=\"{}\"", format_cell_ref(col, row));
    if let Some(s) = cell.style {
        let _ = write!(out, " s=\"{s}\"");
    }

    match &cell.content {
        CellContent::Raw { .. } | CellContent::Blank => out.push_str("/>"),
        CellContent::Integer(i) => {
            let _ = write!(out, "><{p}v>{i}</{p}v></{p}c>");
        }
        CellContent::Number(n) => {
            let _ = write!(out, "><{p}v>{}</{p}v></{p}c>", format_plain_number(*n));
        }
        CellContent::Text(text) => {
            let space = if text.trim() != text {
                " xml:space=\"preserve\""
            } else {
                ""
            };
            let _ = write!(
                out,
                " t=\"inlineStr\"><{p}is><{p}t{space}>{}</{p}t></{p}is></{p}c>",
                xml_escape(text)
            );
        }
    }
}
