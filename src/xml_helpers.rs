//! Shared XML attribute and text helpers.
//!
//! All functions handle namespace-prefixed attributes and UTF-8 conversion
//! safely. Values returned by [`raw_attrs`] are kept exactly as written in the
//! source document (still XML-escaped) so they can be re-emitted verbatim.

use quick_xml::events::{BytesEnd, BytesStart};
use std::ops::Range;

/// Extract a string attribute value by key, unescaped.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a string attribute by local name (ignoring namespace prefix).
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f64` attribute value by key.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract a boolean attribute value by key.
///
/// Returns `None` if missing. Recognizes `"1"`, `"true"` as true.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// All attributes of an element as `(qualified key, raw value)` pairs.
///
/// Values are not unescaped.
pub fn raw_attrs(e: &BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .map(|attr| {
            (
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            )
        })
        .collect()
}

/// Namespace prefix of an element including the colon (`"x:"`), or empty.
pub fn element_prefix(e: &BytesStart) -> String {
    e.name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

/// Append ` key="value"` pairs to `out`; values must already be escaped.
pub fn push_raw_attrs(out: &mut String, attrs: &[(String, String)]) {
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(value);
        out.push('"');
    }
}

/// Minimal XML escaping for attribute/text content.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace the value of `key` in a raw attribute list, appending it if absent.
pub fn set_raw_attr(attrs: &mut Vec<(String, String)>, key: &str, value: String) {
    if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == key) {
        slot.1 = value;
    } else {
        attrs.push((key.to_string(), value));
    }
}

/// Look up a raw attribute value by key.
pub fn get_raw_attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Byte span of a start or empty tag, given the reader position after it.
pub fn start_tag_span(pos_after: usize, e: &BytesStart, empty: bool) -> Range<usize> {
    let markup = if empty { e.len() + 3 } else { e.len() + 2 };
    pos_after.saturating_sub(markup)..pos_after
}

/// Byte span of an end tag, given the reader position after it.
pub fn end_tag_span(pos_after: usize, e: &BytesEnd) -> Range<usize> {
    pos_after.saturating_sub(e.len() + 3)..pos_after
}

/// Qualified element name as written (`x:row`).
pub fn qualified_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Apply non-overlapping byte-range replacements to `source`.
pub fn apply_edits(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| (range.start, range.end));
    let mut out = String::with_capacity(source.len() + 256);
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            continue;
        }
        out.push_str(source.get(cursor..range.start).unwrap_or_default());
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(source.get(cursor..).unwrap_or_default());
    out
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

    fn make_start(xml: &str) -> BytesStart<'_> {
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string_unescapes() {
        let e = make_start(r#"<foo name="a &amp; b" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("a & b".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_raw_attrs_keep_escaping() {
        let e = make_start(r#"<row r="3" x14ac:dyDescent="0.25" note="a &amp; b"/>"#);
        let attrs = raw_attrs(&e);
        assert_eq!(attrs.len(), 3);
        assert_eq!(get_raw_attr(&attrs, "x14ac:dyDescent"), Some("0.25"));
        assert_eq!(get_raw_attr(&attrs, "note"), Some("a &amp; b"));
    }

    #[test]
    fn test_attr_numbers_and_bools() {
        let e = make_start(r#"<col min="39" width="9.5" hidden="1" />"#);
        assert_eq!(attr_u32(&e, b"min"), Some(39));
        assert_eq!(attr_f64(&e, b"width"), Some(9.5));
        assert_eq!(attr_bool(&e, b"hidden"), Some(true));
        assert_eq!(attr_bool(&e, b"customWidth"), None);
    }

    #[test]
    fn test_element_prefix() {
        let e = make_start(r#"<x:sheetData>"#);
        assert_eq!(element_prefix(&e), "x:");
        let e = make_start(r#"<sheetData>"#);
        assert_eq!(element_prefix(&e), "");
    }

    #[test]
    fn test_set_raw_attr() {
        let mut attrs = vec![("r".to_string(), "1".to_string())];
        set_raw_attr(&mut attrs, "r", "7".to_string());
        set_raw_attr(&mut attrs, "ht", "20".to_string());
        assert_eq!(attrs, vec![
            ("r".to_string(), "7".to_string()),
            ("ht".to_string(), "20".to_string())
        ]);
        let mut out = String::new();
        push_raw_attrs(&mut out, &attrs);
        assert_eq!(out, r#" r="7" ht="20""#);
    }

    #[test]
    fn test_tag_spans() {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let xml = r#"<a><b k="v"/> <c>t</c></a>"#;
        let mut reader = Reader::from_str(xml);
        let mut spans = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => spans.push(start_tag_span(reader.buffer_position(), &e, false)),
                Event::Empty(e) => spans.push(start_tag_span(reader.buffer_position(), &e, true)),
                Event::End(e) => spans.push(end_tag_span(reader.buffer_position(), &e)),
                Event::Eof => break,
                _ => {}
            }
        }
        let tags: Vec<&str> = spans.iter().map(|r| &xml[r.clone()]).collect();
        assert_eq!(tags, vec!["<a>", r#"<b k="v"/>"#, "<c>", "</c>", "</a>"]);
    }

    #[test]
    fn test_apply_edits() {
        let out = apply_edits("abcdef", vec![(4..5, "E".into()), (1..1, "+".into())]);
        assert_eq!(out, "a+bcdEf");
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("A<B & \"C\""), "A&lt;B &amp; &quot;C&quot;");
    }
}
