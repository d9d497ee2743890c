//! Worksheet parsing into an editable [`SheetDocument`].
//!
//! Cells are captured as their raw XML alongside a decoded value, so cells the
//! fill never touches are written back byte for byte.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::cell_ref::{format_cell_ref, parse_cell_ref_bytes, CellRange};
use crate::error::{Result, SizegridError};
use crate::numfmt::excel_date_to_ymd;
use crate::styles::StyleBook;
use crate::types::{
    AutoFilter, CellContent, CellEntry, CellValue, ColSpec, RowEntry, SheetDocument, SheetLayout,
};
use crate::xml_helpers::{
    attr_f64, attr_string, attr_u32, element_prefix, end_tag_span, qualified_name, raw_attrs,
    start_tag_span,
};

use super::relationships::SheetInfo;

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    IsoDate,
    Default,
}

fn parse_cell_type_tag(value: Option<&str>) -> CellTypeTag {
    match value {
        Some("s") => CellTypeTag::Shared,
        Some("b") => CellTypeTag::Bool,
        Some("e") => CellTypeTag::Error,
        Some("str") => CellTypeTag::Str,
        Some("inlineStr") => CellTypeTag::Inline,
        Some("d") => CellTypeTag::IsoDate,
        _ => CellTypeTag::Default,
    }
}

/// Lookups needed to decode cell values.
pub(crate) struct ValueContext<'a> {
    pub shared_strings: &'a [String],
    pub styles: &'a StyleBook,
    pub date1904: bool,
}

/// A `<c>` element being read.
struct PendingCell {
    col: u32,
    start: usize,
    style: Option<u32>,
    tag: CellTypeTag,
    /// Qualified name, only kept when the `r` attribute is missing.
    missing_ref: Option<String>,
    value_text: String,
    inline_text: String,
}

impl PendingCell {
    fn decode(&self, ctx: &ValueContext<'_>) -> CellValue {
        let v = self.value_text.as_str();
        match self.tag {
            CellTypeTag::Shared => v
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| ctx.shared_strings.get(idx))
                .map_or(CellValue::Empty, |s| CellValue::Text(s.clone())),
            CellTypeTag::Inline => CellValue::Text(self.inline_text.clone()),
            CellTypeTag::Str | CellTypeTag::IsoDate => CellValue::Text(v.to_string()),
            CellTypeTag::Bool => CellValue::Bool(v.trim() == "1"),
            CellTypeTag::Error => CellValue::Error(v.to_string()),
            CellTypeTag::Default => {
                if v.trim().is_empty() {
                    return CellValue::Empty;
                }
                match v.trim().parse::<f64>() {
                    Ok(n) if ctx.styles.is_date_style(self.style) => {
                        let (year, month, day) = excel_date_to_ymd(n, ctx.date1904);
                        CellValue::Date { year, month, day }
                    }
                    Ok(n) => CellValue::Number(n),
                    Err(_) => CellValue::Text(v.to_string()),
                }
            }
        }
    }
}

/// Which text node is being accumulated.
#[derive(Copy, Clone, PartialEq, Eq)]
enum TextTarget {
    None,
    Value,
    Inline,
}

/// Parse a worksheet part.
#[allow(clippy::too_many_lines)]
pub(crate) fn parse_sheet(
    info: &SheetInfo,
    xml: String,
    ctx: &ValueContext<'_>,
) -> Result<SheetDocument> {
    let mut layout = SheetLayout::default();
    let mut sheet_data: Option<Range<usize>> = None;
    let mut prefix = String::new();
    let mut cols: Vec<ColSpec> = Vec::new();
    let mut rows: BTreeMap<u32, RowEntry> = BTreeMap::new();
    let mut auto_filter: Option<AutoFilter> = None;
    let mut default_col_width: Option<f64> = None;

    {
        let mut reader = Reader::from_str(&xml);
        reader.trim_text(false);

        // Element depth: the worksheet root is 0, its children 1.
        let mut depth: usize = 0;
        let mut in_cols = false;
        let mut cols_start = 0;
        let mut sheet_data_start = 0;
        let mut in_sheet_data = false;
        let mut current_row: u32 = 0;
        let mut current_col: u32 = 0;
        let mut cell: Option<PendingCell> = None;
        let mut text_target = TextTarget::None;
        let mut in_phonetic = false;

        loop {
            let event = reader.read_event()?;
            let pos = reader.buffer_position();
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    let local = e.local_name();
                    let local = local.as_ref();
                    let child_depth = depth;
                    if !empty {
                        depth += 1;
                    }

                    if child_depth == 1 {
                        match local {
                            b"dimension" => {
                                layout.dimension = Some(start_tag_span(pos, e, empty));
                            }
                            b"sheetFormatPr" => {
                                default_col_width = attr_f64(e, b"defaultColWidth");
                            }
                            b"cols" => {
                                let span = start_tag_span(pos, e, empty);
                                if empty {
                                    layout.cols = Some(span);
                                } else {
                                    cols_start = span.start;
                                    in_cols = true;
                                }
                            }
                            b"sheetData" => {
                                prefix = element_prefix(e);
                                let span = start_tag_span(pos, e, empty);
                                if empty {
                                    sheet_data = Some(span);
                                } else {
                                    sheet_data_start = span.start;
                                    in_sheet_data = true;
                                }
                            }
                            b"autoFilter" => {
                                let attrs = raw_attrs(e);
                                if let Some(range) =
                                    attr_string(e, b"ref").as_deref().and_then(CellRange::parse)
                                {
                                    auto_filter = Some(AutoFilter {
                                        span: start_tag_span(pos, e, empty),
                                        self_closing: empty,
                                        attrs,
                                        range,
                                    });
                                }
                            }
                            _ => {}
                        }
                        continue;
                    }

                    if in_cols && local == b"col" {
                        if let (Some(min), Some(max)) = (attr_u32(e, b"min"), attr_u32(e, b"max")) {
                            let attrs = raw_attrs(e)
                                .into_iter()
                                .filter(|(k, _)| k != "min" && k != "max")
                                .collect();
                            cols.push(ColSpec { min, max, attrs });
                        }
                        continue;
                    }

                    if !in_sheet_data {
                        continue;
                    }

                    match local {
                        b"row" => {
                            current_row = attr_u32(e, b"r").unwrap_or(current_row + 1);
                            current_col = 0;
                            let attrs = raw_attrs(e)
                                .into_iter()
                                .filter(|(k, _)| k != "r" && k != "spans")
                                .collect();
                            rows.insert(current_row, RowEntry {
                                attrs,
                                cells: BTreeMap::new(),
                            });
                        }
                        b"c" => {
                            let start = start_tag_span(pos, e, empty).start;
                            let pending = open_cell(e, start, current_col);
                            current_col = pending.col;
                            if empty {
                                let raw = capture_raw(&xml, &pending, current_row, start..pos);
                                insert_cell(&mut rows, current_row, &pending, raw, ctx);
                            } else {
                                cell = Some(pending);
                            }
                        }
                        b"v" if cell.is_some() => text_target = TextTarget::Value,
                        b"rPh" => in_phonetic = true,
                        b"t" if cell.is_some() && !in_phonetic => text_target = TextTarget::Inline,
                        _ => {}
                    }
                }
                Event::Text(ref e) => {
                    if let Some(pending) = cell.as_mut() {
                        match text_target {
                            TextTarget::Value => pending.value_text.push_str(&e.unescape()?),
                            TextTarget::Inline => pending.inline_text.push_str(&e.unescape()?),
                            TextTarget::None => {}
                        }
                    }
                }
                Event::End(ref e) => {
                    depth = depth.saturating_sub(1);
                    match e.local_name().as_ref() {
                        b"cols" if in_cols && depth == 1 => {
                            in_cols = false;
                            layout.cols = Some(cols_start..pos);
                        }
                        b"sheetData" if in_sheet_data && depth == 1 => {
                            in_sheet_data = false;
                            sheet_data = Some(sheet_data_start..end_tag_span(pos, e).end);
                        }
                        b"c" => {
                            if let Some(pending) = cell.take() {
                                let raw = capture_raw(&xml, &pending, current_row, pending.start..pos);
                                insert_cell(&mut rows, current_row, &pending, raw, ctx);
                            }
                            text_target = TextTarget::None;
                        }
                        b"v" | b"t" => text_target = TextTarget::None,
                        b"rPh" => in_phonetic = false,
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
    }

    layout.sheet_data = sheet_data.ok_or_else(|| {
        SizegridError::Parse(format!("{} has no sheetData element", info.path))
    })?;

    tracing::debug!(
        "Parsed sheet '{}': {} rows, {} column specs",
        info.name,
        rows.len(),
        cols.len()
    );

    Ok(SheetDocument {
        name: info.name.clone(),
        path: info.path.clone(),
        xml,
        layout,
        prefix,
        cols,
        rows,
        auto_filter,
        default_col_width,
    })
}

fn open_cell(e: &BytesStart, start: usize, prev_col: u32) -> PendingCell {
    let reference = e
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"r")
        .and_then(|a| parse_cell_ref_bytes(&a.value));
    let col = reference.map_or(prev_col + 1, |(col, _)| col);
    let missing_ref = reference.is_none().then(|| qualified_name(e));

    PendingCell {
        col,
        start,
        style: attr_u32(e, b"s"),
        tag: parse_cell_type_tag(attr_string(e, b"t").as_deref()),
        missing_ref,
        value_text: String::new(),
        inline_text: String::new(),
    }
}

/// The cell's source XML, with an `r` attribute added if it had none.
fn capture_raw(xml: &str, pending: &PendingCell, row: u32, span: Range<usize>) -> String {
    let source = xml.get(span).unwrap_or_default();
    let Some(qname) = &pending.missing_ref else {
        return source.to_string();
    };
    let rest = source.get(qname.len() + 1..).unwrap_or_default();
    format!(
        "<{qname} r=\"{}\"{rest}",
        format_cell_ref(pending.col, row)
    )
}

fn insert_cell(
    rows: &mut BTreeMap<u32, RowEntry>,
    row: u32,
    pending: &PendingCell,
    xml: String,
    ctx: &ValueContext<'_>,
) {
    let entry = CellEntry {
        style: pending.style,
        content: CellContent::Raw {
            xml,
            value: pending.decode(ctx),
        },
    };
    rows.entry(row).or_default().cells.insert(pending.col, entry);
}
