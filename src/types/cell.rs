use quick_xml::events::Event;
use quick_xml::Reader;

use crate::size_key::RawSize;

/// A cell value as read from a worksheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
    /// A number whose cell format is a date, already converted.
    Date { year: i32, month: u32, day: u32 },
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text as an operator would read it; integral numbers drop the `.0`.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) | CellValue::Error(s) => s.clone(),
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Date { year, month, day } => format!("{year:04}-{month:02}-{day:02}"),
        }
    }

    /// Interpret the value as a size label.
    pub fn to_raw_size(&self) -> RawSize {
        match self {
            CellValue::Empty => RawSize::Missing,
            CellValue::Number(n) => RawSize::Number(*n),
            CellValue::Date { year, month, day } => RawSize::Date {
                year: *year,
                month: *month,
                day: *day,
            },
            CellValue::Text(s) if s.trim().is_empty() => RawSize::Missing,
            other => RawSize::Text(other.display_text()),
        }
    }
}

/// Format a number without a trailing `.0` for integral values.
#[allow(clippy::cast_possible_truncation)]
pub fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// What a cell in the document holds.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    /// Untouched source element, re-emitted byte for byte.
    Raw { xml: String, value: CellValue },
    /// Formatting only, no value.
    Blank,
    Integer(i64),
    Number(f64),
    /// Written as an inline string.
    Text(String),
}

/// A cell: its format index plus content.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEntry {
    /// Index into the stylesheet's `cellXfs`.
    pub style: Option<u32>,
    pub content: CellContent,
}

impl CellEntry {
    pub fn blank(style: Option<u32>) -> Self {
        Self {
            style,
            content: CellContent::Blank,
        }
    }

    pub fn value(&self) -> CellValue {
        match &self.content {
            CellContent::Raw { value, .. } => value.clone(),
            CellContent::Blank => CellValue::Empty,
            #[allow(clippy::cast_precision_loss)]
            CellContent::Integer(i) => CellValue::Number(*i as f64),
            CellContent::Number(n) => CellValue::Number(*n),
            CellContent::Text(s) => CellValue::Text(s.clone()),
        }
    }

    /// Whether the source element carries an `<f>` formula.
    pub fn has_formula(&self) -> bool {
        let CellContent::Raw { xml, .. } = &self.content else {
            return false;
        };
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"f" => {
                    return true
                }
                Ok(Event::Eof) | Err(_) => return false,
                _ => {}
            }
        }
    }

    /// Numeric value, if the cell holds one.
    pub fn numeric_value(&self) -> Option<f64> {
        match &self.content {
            CellContent::Raw { value, .. } => value.as_number(),
            #[allow(clippy::cast_precision_loss)]
            CellContent::Integer(i) => Some(*i as f64),
            CellContent::Number(n) => Some(*n),
            CellContent::Blank | CellContent::Text(_) => None,
        }
    }
}
