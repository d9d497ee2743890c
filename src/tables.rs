//! Structured tables (`xl/tables/tableN.xml`).
//!
//! A template often formats its data area as a table. Rows appended below the
//! table are outside it unless its range grows, so the table, its auto-filter
//! and its sort state are widened to the last written row.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::Range;

use crate::cell_ref::CellRange;
use crate::error::{Result, SizegridError};
use crate::xml_helpers::{
    apply_edits, attr_string, attr_u32, push_raw_attrs, qualified_name, raw_attrs, set_raw_attr,
    start_tag_span,
};

/// An element carrying a `ref` range.
#[derive(Debug, Clone)]
struct RefTag {
    span: Range<usize>,
    qname: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    range: CellRange,
}

/// One table part of the target sheet.
#[derive(Debug, Clone)]
pub struct TablePart {
    pub path: String,
    pub name: String,
    pub range: CellRange,
    pub has_totals_row: bool,
    xml: String,
    ref_tags: Vec<RefTag>,
}

impl TablePart {
    pub fn parse(path: &str, xml: String) -> Result<Self> {
        let mut name = String::new();
        let mut range = None;
        let mut has_totals_row = false;
        let mut ref_tags = Vec::new();

        {
            let mut reader = Reader::from_str(&xml);
            loop {
                let event = reader.read_event()?;
                let pos = reader.buffer_position();
                match event {
                    Event::Start(ref e) | Event::Empty(ref e) => {
                        let empty = matches!(event, Event::Empty(_));
                        let local = e.local_name();
                        if !matches!(
                            local.as_ref(),
                            b"table" | b"autoFilter" | b"sortState" | b"sortCondition"
                        ) {
                            continue;
                        }
                        let Some(tag_range) =
                            attr_string(e, b"ref").as_deref().and_then(CellRange::parse)
                        else {
                            continue;
                        };
                        if local.as_ref() == b"table" {
                            name = attr_string(e, b"displayName")
                                .or_else(|| attr_string(e, b"name"))
                                .unwrap_or_default();
                            has_totals_row = attr_u32(e, b"totalsRowCount").unwrap_or(0) > 0;
                            range = Some(tag_range);
                        }
                        ref_tags.push(RefTag {
                            span: start_tag_span(pos, e, empty),
                            qname: qualified_name(e),
                            attrs: raw_attrs(e),
                            self_closing: empty,
                            range: tag_range,
                        });
                    }
                    Event::Eof => break,
                    _ => {}
                }
            }
        }

        let range =
            range.ok_or_else(|| SizegridError::Parse(format!("{path} has no table range")))?;

        Ok(Self {
            path: path.to_string(),
            name,
            range,
            has_totals_row,
            xml,
            ref_tags,
        })
    }

    /// Whether the table's header sits on `header_row`.
    pub fn anchored_at(&self, header_row: u32) -> bool {
        self.range.start_row == header_row
    }

    /// Grow the table down to `last_row`.
    ///
    /// Returns the rewritten part, or `None` when the table does not start at
    /// `header_row`, already reaches `last_row`, or has a totals row that
    /// would have to move.
    pub fn expand(&mut self, header_row: u32, last_row: u32) -> Option<String> {
        if !self.anchored_at(header_row) || self.range.end_row >= last_row {
            return None;
        }
        if self.has_totals_row {
            tracing::warn!(
                "Table '{}' has a totals row; leaving its range {} as is",
                self.name,
                self.range
            );
            return None;
        }

        let old_end = self.range.end_row;
        let mut edits = Vec::new();
        for tag in &mut self.ref_tags {
            if tag.range.end_row != old_end {
                continue;
            }
            tag.range.end_row = last_row;
            set_raw_attr(&mut tag.attrs, "ref", tag.range.to_string());
            let mut open = format!("<{}", tag.qname);
            push_raw_attrs(&mut open, &tag.attrs);
            open.push_str(if tag.self_closing { "/>" } else { ">" });
            edits.push((tag.span.clone(), open));
        }
        self.range.end_row = last_row;
        // Spans index the source XML, which stays as parsed.
        Some(apply_edits(&self.xml, edits))
    }
}
