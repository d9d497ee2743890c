//! The workbook stylesheet (`xl/styles.xml`).
//!
//! Only two things are needed from it: whether a cell format displays a date,
//! and bold variants of existing cell formats for emphasized values. Variants
//! are appended to `<fonts>` and `<cellXfs>`; existing entries are never
//! modified, so every other cell keeps its look.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::ops::Range;

use crate::error::Result;
use crate::numfmt::{is_builtin_date_id, is_date_format};
use crate::xml_helpers::{
    apply_edits, attr_string, attr_u32, element_prefix, end_tag_span, get_raw_attr,
    push_raw_attrs, qualified_name, raw_attrs, set_raw_attr, start_tag_span,
};

/// An element kept as its parts so a modified copy can be written.
#[derive(Debug, Clone, PartialEq)]
struct ElementParts {
    qname: String,
    prefix: String,
    attrs: Vec<(String, String)>,
    /// Raw inner XML; `None` for a self-closing element.
    inner: Option<String>,
}

impl ElementParts {
    fn to_xml(&self) -> String {
        let mut out = format!("<{}", self.qname);
        push_raw_attrs(&mut out, &self.attrs);
        match &self.inner {
            Some(inner) => {
                out.push('>');
                out.push_str(inner);
                out.push_str("</");
                out.push_str(&self.qname);
                out.push('>');
            }
            None => out.push_str("/>"),
        }
        out
    }
}

/// A `<font>` or `<xf>` whose children are being read.
struct Capture {
    parts: ElementParts,
    inner_start: usize,
    local: Vec<u8>,
    bold: bool,
}

#[derive(Debug, Clone)]
struct FontEntry {
    parts: ElementParts,
    bold: bool,
}

#[derive(Debug, Clone)]
struct XfEntry {
    parts: ElementParts,
    num_fmt_id: u32,
    font_id: u32,
}

/// A `<fonts>` or `<cellXfs>` collection and where it sits in the source.
#[derive(Debug, Clone, Default)]
struct Collection {
    open_tag: Range<usize>,
    qname: String,
    attrs: Vec<(String, String)>,
    /// Byte offset of the closing tag; `None` when self-closing.
    close_at: Option<usize>,
    added: Vec<String>,
}

/// Cell formats of a workbook, with support for appending bold variants.
#[derive(Debug, Clone, Default)]
pub struct StyleBook {
    path: Option<String>,
    xml: String,
    num_fmts: HashMap<u32, String>,
    fonts: Vec<FontEntry>,
    xfs: Vec<XfEntry>,
    font_collection: Option<Collection>,
    xf_collection: Option<Collection>,
    bold_fonts: HashMap<u32, u32>,
    bold_xfs: HashMap<u32, u32>,
}

impl StyleBook {
    /// Parse a stylesheet part.
    #[allow(clippy::too_many_lines)]
    pub fn parse(path: &str, xml: String) -> Result<Self> {
        let mut book = StyleBook {
            path: Some(path.to_string()),
            ..StyleBook::default()
        };

        let mut reader = Reader::from_str(&xml);
        reader.trim_text(false);

        let mut in_num_fmts = false;
        let mut in_fonts = false;
        let mut in_cell_xfs = false;
        let mut capture: Option<Capture> = None;
        let mut capture_depth = 0usize;

        loop {
            let event = reader.read_event()?;
            let pos = reader.buffer_position();
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    let local = e.local_name();
                    let local = local.as_ref();

                    if let Some(open) = capture.as_mut() {
                        if local == b"b" && capture_depth == 0 {
                            open.bold = attr_string(e, b"val")
                                .map_or(true, |v| !matches!(v.as_str(), "0" | "false"));
                        }
                        if !empty {
                            capture_depth += 1;
                        }
                        continue;
                    }

                    match local {
                        b"numFmts" if !empty => in_num_fmts = true,
                        b"numFmt" if in_num_fmts => {
                            if let (Some(id), Some(code)) =
                                (attr_u32(e, b"numFmtId"), attr_string(e, b"formatCode"))
                            {
                                book.num_fmts.insert(id, code);
                            }
                        }
                        b"fonts" | b"cellXfs" => {
                            let collection = Collection {
                                open_tag: start_tag_span(pos, e, empty),
                                qname: qualified_name(e),
                                attrs: raw_attrs(e),
                                close_at: None,
                                added: Vec::new(),
                            };
                            if local == b"fonts" {
                                in_fonts = !empty;
                                book.font_collection = Some(collection);
                            } else {
                                in_cell_xfs = !empty;
                                book.xf_collection = Some(collection);
                            }
                        }
                        b"font" | b"xf"
                            if (local == b"font" && in_fonts) || (local == b"xf" && in_cell_xfs) =>
                        {
                            let parts = ElementParts {
                                qname: qualified_name(e),
                                prefix: element_prefix(e),
                                attrs: raw_attrs(e),
                                inner: None,
                            };
                            if empty {
                                book.push_entry(local, parts, false);
                            } else {
                                capture = Some(Capture {
                                    parts,
                                    inner_start: pos,
                                    local: local.to_vec(),
                                    bold: false,
                                });
                                capture_depth = 0;
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let local = e.local_name();
                    let local = local.as_ref();

                    if capture.is_some() {
                        if capture_depth > 0 {
                            capture_depth -= 1;
                            continue;
                        }
                        if let Some(mut open) = capture.take() {
                            let span = end_tag_span(pos, e);
                            open.parts.inner = Some(
                                xml.get(open.inner_start..span.start)
                                    .unwrap_or_default()
                                    .to_string(),
                            );
                            book.push_entry(&open.local, open.parts, open.bold);
                        }
                        continue;
                    }

                    match local {
                        b"numFmts" => in_num_fmts = false,
                        b"fonts" => {
                            in_fonts = false;
                            if let Some(c) = book.font_collection.as_mut() {
                                c.close_at = Some(end_tag_span(pos, e).start);
                            }
                        }
                        b"cellXfs" => {
                            in_cell_xfs = false;
                            if let Some(c) = book.xf_collection.as_mut() {
                                c.close_at = Some(end_tag_span(pos, e).start);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        book.xml = xml;
        tracing::debug!(
            "Stylesheet: {} fonts, {} cell formats, {} custom number formats",
            book.fonts.len(),
            book.xfs.len(),
            book.num_fmts.len()
        );
        Ok(book)
    }

    fn push_entry(&mut self, local: &[u8], parts: ElementParts, bold: bool) {
        if local == b"font" {
            self.fonts.push(FontEntry { parts, bold });
        } else {
            let num_fmt_id = get_raw_attr(&parts.attrs, "numFmtId")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let font_id = get_raw_attr(&parts.attrs, "fontId")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            self.xfs.push(XfEntry {
                parts,
                num_fmt_id,
                font_id,
            });
        }
    }

    /// Package path of the stylesheet, if the workbook has one.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn cell_format_count(&self) -> usize {
        self.xfs.len()
    }

    /// Number format code of a cell format.
    pub fn format_code(&self, style: Option<u32>) -> Option<String> {
        let id = self.xf(style)?.num_fmt_id;
        self.num_fmts
            .get(&id)
            .cloned()
            .or_else(|| crate::numfmt::builtin_format(id).map(str::to_string))
    }

    /// Whether a cell with this format index displays its number as a date.
    pub fn is_date_style(&self, style: Option<u32>) -> bool {
        let Some(xf) = self.xf(style) else {
            return false;
        };
        match self.num_fmts.get(&xf.num_fmt_id) {
            Some(code) => is_date_format(code),
            None => is_builtin_date_id(xf.num_fmt_id),
        }
    }

    /// Whether a cell format renders its text bold.
    pub fn is_bold(&self, style: Option<u32>) -> bool {
        self.xf(style)
            .and_then(|xf| usize::try_from(xf.font_id).ok())
            .and_then(|id| self.fonts.get(id))
            .is_some_and(|f| f.bold)
    }

    /// Cell format identical to `style` but with a bold font.
    ///
    /// Variants are created once per source format and reused. Returns `None`
    /// when the workbook has no stylesheet to extend.
    pub fn bold_variant(&mut self, style: Option<u32>) -> Option<u32> {
        let index = style.unwrap_or(0);
        if let Some(&cached) = self.bold_xfs.get(&index) {
            return Some(cached);
        }
        let xf = self.xf(Some(index))?.clone();
        if self.is_bold(Some(index)) {
            return Some(index);
        }

        let font_id = self.bold_font(xf.font_id)?;
        let mut parts = xf.parts.clone();
        set_raw_attr(&mut parts.attrs, "fontId", font_id.to_string());
        set_raw_attr(&mut parts.attrs, "applyFont", "1".to_string());
        let new_index = u32::try_from(self.xfs.len()).ok()?;
        self.xf_collection.as_mut()?.added.push(parts.to_xml());
        self.xfs.push(XfEntry {
            parts,
            num_fmt_id: xf.num_fmt_id,
            font_id,
        });
        self.bold_xfs.insert(index, new_index);
        Some(new_index)
    }

    fn bold_font(&mut self, font_id: u32) -> Option<u32> {
        if let Some(&cached) = self.bold_fonts.get(&font_id) {
            return Some(cached);
        }
        let source = self.fonts.get(usize::try_from(font_id).ok()?)?;
        let mut parts = source.parts.clone();
        let bold_tag = format!("<{}b/>", parts.prefix);
        parts.inner = Some(match parts.inner.take() {
            Some(inner) => format!("{bold_tag}{inner}"),
            None => bold_tag,
        });
        let new_id = u32::try_from(self.fonts.len()).ok()?;
        self.font_collection.as_mut()?.added.push(parts.to_xml());
        self.fonts.push(FontEntry { parts, bold: true });
        self.bold_fonts.insert(font_id, new_id);
        Some(new_id)
    }

    fn xf(&self, style: Option<u32>) -> Option<&XfEntry> {
        self.xfs.get(usize::try_from(style.unwrap_or(0)).ok()?)
    }

    /// Whether formats were appended since parsing.
    pub fn is_modified(&self) -> bool {
        [&self.font_collection, &self.xf_collection]
            .into_iter()
            .flatten()
            .any(|c| !c.added.is_empty())
    }

    /// Serialized stylesheet, or `None` when nothing was added.
    pub fn to_xml(&self) -> Option<String> {
        if !self.is_modified() {
            return None;
        }

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        for (collection, total) in [
            (&self.font_collection, self.fonts.len()),
            (&self.xf_collection, self.xfs.len()),
        ] {
            let Some(c) = collection else { continue };
            if c.added.is_empty() {
                continue;
            }
            let mut attrs = c.attrs.clone();
            set_raw_attr(&mut attrs, "count", total.to_string());
            let mut open = format!("<{}", c.qname);
            push_raw_attrs(&mut open, &attrs);
            open.push('>');
            let added = c.added.concat();
            match c.close_at {
                Some(close_at) => {
                    edits.push((c.open_tag.clone(), open));
                    edits.push((close_at..close_at, added));
                }
                None => {
                    edits.push((c.open_tag.clone(), format!("{open}{added}</{}>", c.qname)));
                }
            }
        }
        Some(apply_edits(&self.xml, edits))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" applyNumberFormat="1"/><xf numFmtId="14" fontId="1"/><xf numFmtId="0" fontId="0" borderId="0" applyAlignment="1"><alignment horizontal="center"/></xf></cellXfs><dxfs count="1"><dxf><font><b/></font></dxf></dxfs></styleSheet>"#;

    #[test]
    fn test_parse_counts_only_cell_xfs() {
        let book = StyleBook::parse("xl/styles.xml", STYLES.to_string()).unwrap();
        assert_eq!(book.cell_format_count(), 4);
        assert_eq!(book.fonts.len(), 2);
        assert!(book.is_bold(Some(2)));
        assert!(!book.is_bold(Some(0)));
    }

    #[test]
    fn test_date_styles() {
        let book = StyleBook::parse("xl/styles.xml", STYLES.to_string()).unwrap();
        assert!(!book.is_date_style(None));
        assert!(book.is_date_style(Some(1)));
        assert!(book.is_date_style(Some(2)));
        assert!(!book.is_date_style(Some(3)));
        assert!(!book.is_date_style(Some(99)));
    }

    #[test]
    fn test_bold_variant_appends_once() {
        let mut book = StyleBook::parse("xl/styles.xml", STYLES.to_string()).unwrap();
        assert!(book.to_xml().is_none());

        let variant = book.bold_variant(Some(3)).unwrap();
        assert_eq!(variant, 4);
        assert_eq!(book.bold_variant(Some(3)), Some(4));
        assert!(book.is_bold(Some(4)));
        // Already bold: no new format
        assert_eq!(book.bold_variant(Some(2)), Some(2));

        let xml = book.to_xml().unwrap();
        assert!(xml.contains(r#"<fonts count="3">"#));
        assert!(xml.contains(r#"<cellXfs count="5">"#));
        assert!(xml.contains(
            r#"<font><b/><sz val="11"/><name val="Calibri"/></font></fonts>"#
        ));
        assert!(xml.contains(
            r#"<xf numFmtId="0" fontId="2" borderId="0" applyAlignment="1" applyFont="1"><alignment horizontal="center"/></xf></cellXfs>"#
        ));
        // Differential formats untouched
        assert!(xml.contains(r#"<dxfs count="1"><dxf><font><b/></font></dxf></dxfs>"#));

        let reparsed = StyleBook::parse("xl/styles.xml", xml).unwrap();
        assert_eq!(reparsed.cell_format_count(), 5);
        assert!(reparsed.is_bold(Some(4)));
    }
}
