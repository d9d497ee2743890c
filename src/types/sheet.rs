use std::collections::BTreeMap;
use std::ops::Range;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::cell_ref::CellRange;
use crate::error::{Result, SizegridError};
use crate::xml_helpers::{get_raw_attr, push_raw_attrs, raw_attrs, set_raw_attr};

use super::cell::{CellContent, CellEntry, CellValue};

/// Column width Excel uses when a sheet declares none.
pub const FALLBACK_COL_WIDTH: f64 = 8.710_937_5;

/// One `<row>` of `<sheetData>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowEntry {
    /// Raw attributes except `r` and `spans`, which are regenerated.
    pub attrs: Vec<(String, String)>,
    /// Cells keyed by 1-based column.
    pub cells: BTreeMap<u32, CellEntry>,
}

impl RowEntry {
    /// Row-level format applied to cells that have none (`customFormat="1"`).
    pub fn style(&self) -> Option<u32> {
        if get_raw_attr(&self.attrs, "customFormat").is_some_and(|v| v == "1" || v == "true") {
            get_raw_attr(&self.attrs, "s").and_then(|s| s.parse().ok())
        } else {
            None
        }
    }

    /// A value-free copy: same row attributes, and a blank cell carrying the
    /// format of every formatted cell up to `max_col`.
    pub fn styled_copy(&self, max_col: u32) -> RowEntry {
        let cells = self
            .cells
            .range(..=max_col)
            .filter_map(|(&col, cell)| cell.style.map(|s| (col, CellEntry::blank(Some(s)))))
            .collect();
        RowEntry {
            attrs: self.attrs.clone(),
            cells,
        }
    }
}

/// One `<col>` element covering `min..=max`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColSpec {
    pub min: u32,
    pub max: u32,
    /// Raw attributes except `min` and `max`.
    pub attrs: Vec<(String, String)>,
}

impl ColSpec {
    pub fn covers(&self, col: u32) -> bool {
        (self.min..=self.max).contains(&col)
    }

    pub fn is_hidden(&self) -> bool {
        get_raw_attr(&self.attrs, "hidden").is_some_and(|v| v == "1" || v == "true")
    }

    pub fn style(&self) -> Option<u32> {
        get_raw_attr(&self.attrs, "style").and_then(|s| s.parse().ok())
    }
}

/// The worksheet-level `<autoFilter>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoFilter {
    /// Byte span of the opening (or self-closing) tag.
    pub span: Range<usize>,
    pub self_closing: bool,
    pub attrs: Vec<(String, String)>,
    pub range: CellRange,
}

/// Byte spans of the regions of the source XML that are regenerated on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub dimension: Option<Range<usize>>,
    pub cols: Option<Range<usize>>,
    pub sheet_data: Range<usize>,
}

/// An editable worksheet.
///
/// Rows, cells and column specs are modelled; every other element of the
/// source XML is carried through untouched.
#[derive(Debug, Clone)]
pub struct SheetDocument {
    pub name: String,
    /// Package path, e.g. `xl/worksheets/sheet1.xml`.
    pub path: String,
    pub(crate) xml: String,
    pub(crate) layout: SheetLayout,
    /// Namespace prefix used by the worksheet elements (`"x:"` or empty).
    pub(crate) prefix: String,
    pub cols: Vec<ColSpec>,
    pub rows: BTreeMap<u32, RowEntry>,
    pub auto_filter: Option<AutoFilter>,
    pub default_col_width: Option<f64>,
}

impl SheetDocument {
    /// Last row present in `<sheetData>`, 0 for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    /// Rightmost column holding a cell on any row.
    pub fn max_col(&self) -> u32 {
        self.rows
            .values()
            .filter_map(|row| row.cells.keys().next_back().copied())
            .max()
            .unwrap_or(0)
    }

    pub fn row(&self, row: u32) -> Option<&RowEntry> {
        self.rows.get(&row)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&CellEntry> {
        self.rows.get(&row).and_then(|r| r.cells.get(&col))
    }

    pub fn value(&self, row: u32, col: u32) -> CellValue {
        self.cell(row, col).map_or(CellValue::Empty, CellEntry::value)
    }

    /// Remove a cell's value, keeping its format.
    ///
    /// A formula goes with the value. When the cell was the master of a
    /// shared formula, the cells sharing it lose their definition. Returns
    /// whether a formula was removed.
    pub fn clear_value(&mut self, row: u32, col: u32) -> bool {
        let Some(cell) = self.rows.get_mut(&row).and_then(|r| r.cells.get_mut(&col)) else {
            return false;
        };
        let had_formula = cell.has_formula();
        if had_formula {
            tracing::debug!(
                "Clearing formula cell {}",
                crate::cell_ref::format_cell_ref(col, row)
            );
        }
        cell.content = CellContent::Blank;
        had_formula
    }

    pub fn set_integer(&mut self, row: u32, col: u32, value: i64) {
        self.put_content(row, col, CellContent::Integer(value));
    }

    pub fn set_number(&mut self, row: u32, col: u32, value: f64) {
        self.put_content(row, col, CellContent::Number(value));
    }

    pub fn set_text(&mut self, row: u32, col: u32, value: &str) {
        self.put_content(row, col, CellContent::Text(value.to_string()));
    }

    /// Replace a cell's format index.
    ///
    /// Untouched cells get the `s` attribute of their source element patched
    /// so their value and formula survive.
    pub fn set_style(&mut self, row: u32, col: u32, style: u32) -> Result<()> {
        let inherited = self.inherited_style(row, col);
        let entry = self
            .rows
            .entry(row)
            .or_default()
            .cells
            .entry(col)
            .or_insert_with(|| CellEntry::blank(inherited));
        if let CellContent::Raw { xml, .. } = &mut entry.content {
            *xml = patch_raw_style(xml, style)?;
        }
        entry.style = Some(style);
        Ok(())
    }

    /// Add a row at an index not yet present. Existing rows are never replaced.
    pub fn insert_row(&mut self, row: u32, entry: RowEntry) -> bool {
        if self.rows.contains_key(&row) {
            return false;
        }
        self.rows.insert(row, entry);
        true
    }

    pub fn column_hidden(&self, col: u32) -> bool {
        self.cols.iter().any(|c| c.covers(col) && c.is_hidden())
    }

    /// Hide one column, splitting a shared `<col>` range when necessary.
    pub fn hide_column(&mut self, col: u32) {
        if self.column_hidden(col) {
            return;
        }
        let Some(idx) = self.cols.iter().position(|c| c.covers(col)) else {
            let width = self.default_col_width.unwrap_or(FALLBACK_COL_WIDTH);
            let spec = ColSpec {
                min: col,
                max: col,
                attrs: vec![
                    ("width".to_string(), format!("{width}")),
                    ("hidden".to_string(), "1".to_string()),
                ],
            };
            let at = self.cols.partition_point(|c| c.max < col);
            self.cols.insert(at, spec);
            return;
        };

        let original = self.cols.remove(idx);
        let mut pieces = Vec::with_capacity(3);
        if original.min < col {
            pieces.push(ColSpec {
                min: original.min,
                max: col - 1,
                attrs: original.attrs.clone(),
            });
        }
        let mut hidden = ColSpec {
            min: col,
            max: col,
            attrs: original.attrs.clone(),
        };
        set_raw_attr(&mut hidden.attrs, "hidden", "1".to_string());
        pieces.push(hidden);
        if original.max > col {
            pieces.push(ColSpec {
                min: col + 1,
                max: original.max,
                attrs: original.attrs,
            });
        }
        for (offset, piece) in pieces.into_iter().enumerate() {
            self.cols.insert(idx + offset, piece);
        }
    }

    /// Stretch the sheet auto-filter anchored on `header_row` down to `last_row`.
    ///
    /// Returns the new range when it changed.
    pub fn expand_auto_filter(&mut self, header_row: u32, last_row: u32) -> Option<CellRange> {
        let filter = self.auto_filter.as_mut()?;
        if filter.range.start_row != header_row || filter.range.end_row >= last_row {
            return None;
        }
        filter.range.end_row = last_row;
        set_raw_attr(&mut filter.attrs, "ref", filter.range.to_string());
        Some(filter.range)
    }

    fn put_content(&mut self, row: u32, col: u32, content: CellContent) {
        let inherited = self.inherited_style(row, col);
        let entry = self
            .rows
            .entry(row)
            .or_default()
            .cells
            .entry(col)
            .or_insert_with(|| CellEntry::blank(inherited));
        entry.content = content;
    }

    /// Format a new cell picks up: the row's format, else the column's.
    fn inherited_style(&self, row: u32, col: u32) -> Option<u32> {
        self.rows.get(&row).and_then(RowEntry::style).or_else(|| {
            self.cols
                .iter()
                .find(|c| c.covers(col))
                .and_then(ColSpec::style)
        })
    }
}

/// Rewrite the `s` attribute of a raw `<c>` element.
fn patch_raw_style(xml: &str, style: u32) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    // `rest_at` is where the tag's closing `>` or `/>` begins.
    let (attrs, qname, rest_at) = match reader.read_event()? {
        Event::Start(e) => (
            raw_attrs(&e),
            String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            e.len() + 1,
        ),
        Event::Empty(e) => (
            raw_attrs(&e),
            String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            e.len() + 1,
        ),
        _ => return Err(SizegridError::Parse(format!("not a cell element: {xml}"))),
    };
    let rest = xml
        .get(rest_at..)
        .filter(|r| r.starts_with('>') || r.starts_with("/>"))
        .ok_or_else(|| SizegridError::Parse(format!("malformed cell element: {xml}")))?;

    let mut attrs = attrs;
    set_raw_attr(&mut attrs, "s", style.to_string());
    let mut out = String::with_capacity(xml.len() + 8);
    out.push('<');
    out.push_str(&qname);
    push_raw_attrs(&mut out, &attrs);
    out.push_str(rest);
    Ok(out)
}
