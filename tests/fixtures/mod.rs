//! Builders for order templates and input workbooks, created in memory.
//!
//! ```rust,ignore
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Order")
//!             .text("C5", "Material Number")
//!             .styled("F6", Value::Blank, STYLE_GRID)
//!             .table("OrderTable", "A5:H8"),
//!     )
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation
)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Cursor, Write};

use sizegrid::cell_ref::{parse_cell_ref, CellRange};
use zip::write::FileOptions;
use zip::ZipWriter;

// ============================================================================
// Styles
// ============================================================================

/// `cellXfs` indices of [`STYLES_XML`].
pub const STYLE_PLAIN: u32 = 0;
/// Thin border on all sides.
pub const STYLE_GRID: u32 = 1;
/// Bold font on a yellow fill.
pub const STYLE_HEADER: u32 = 2;
/// Built-in date format 14.
pub const STYLE_DATE: u32 = 3;
/// Yellow fill with thin borders.
pub const STYLE_SHADED: u32 = 4;

pub const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="5"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"/><xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="0" fontId="0" fillId="2" borderId="1" xfId="0" applyFill="1" applyBorder="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

pub const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Order form</dc:title><dc:creator>Buying team</dc:creator></cp:coreProperties>"#;

// ============================================================================
// Sheet Builder
// ============================================================================

/// A cell value as it is stored in the fixture.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Shared string.
    Text(String),
    /// Inline string.
    Inline(String),
    Number(f64),
    /// Style only.
    Blank,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

#[derive(Debug, Clone)]
struct FixtureCell {
    value: Value,
    style: Option<u32>,
}

#[derive(Debug, Clone)]
struct FixtureTable {
    name: String,
    range: String,
    totals_row: bool,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    cells: BTreeMap<(u32, u32), FixtureCell>,
    cols: Vec<(u32, u32, f64, bool)>,
    row_attrs: BTreeMap<u32, String>,
    merges: Vec<String>,
    auto_filter: Option<String>,
    tables: Vec<FixtureTable>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a cell with a value and optional style.
    #[must_use]
    pub fn cell<V: Into<Value>>(mut self, cell_ref: &str, value: V, style: Option<u32>) -> Self {
        let (col, row) = parse_cell_ref(cell_ref).expect("valid cell reference");
        self.cells.insert(
            (row, col),
            FixtureCell {
                value: value.into(),
                style,
            },
        );
        self
    }

    /// Add a shared-string cell.
    #[must_use]
    pub fn text(self, cell_ref: &str, text: &str) -> Self {
        self.cell(cell_ref, text, None)
    }

    #[must_use]
    pub fn number(self, cell_ref: &str, value: f64) -> Self {
        self.cell(cell_ref, value, None)
    }

    /// Add a cell with a style.
    #[must_use]
    pub fn styled<V: Into<Value>>(self, cell_ref: &str, value: V, style: u32) -> Self {
        self.cell(cell_ref, value, Some(style))
    }

    /// Style every cell of `range` without giving it a value.
    #[must_use]
    pub fn styled_range(mut self, range: &str, style: u32) -> Self {
        let range = CellRange::parse(range).expect("valid range");
        for row in range.start_row..=range.end_row {
            for col in range.start_col..=range.end_col {
                self.cells.entry((row, col)).or_insert(FixtureCell {
                    value: Value::Blank,
                    style: Some(style),
                });
            }
        }
        self
    }

    /// Column width for `min..=max`.
    #[must_use]
    pub fn col(mut self, min: u32, max: u32, width: f64, hidden: bool) -> Self {
        self.cols.push((min, max, width, hidden));
        self
    }

    /// Custom row height.
    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        let attrs = self.row_attrs.entry(row).or_default();
        let _ = write!(attrs, r#" ht="{height}" customHeight="1""#);
        self
    }

    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    /// Worksheet-level auto-filter.
    #[must_use]
    pub fn auto_filter(mut self, range: &str) -> Self {
        self.auto_filter = Some(range.to_string());
        self
    }

    /// Structured table over `range` (header row first).
    #[must_use]
    pub fn table(mut self, name: &str, range: &str) -> Self {
        self.tables.push(FixtureTable {
            name: name.to_string(),
            range: range.to_string(),
            totals_row: false,
        });
        self
    }

    /// Structured table whose last row is a totals row.
    #[must_use]
    pub fn table_with_totals(mut self, name: &str, range: &str) -> Self {
        self.tables.push(FixtureTable {
            name: name.to_string(),
            range: range.to_string(),
            totals_row: true,
        });
        self
    }

    fn build_xml(&self, sst: &mut Vec<String>) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );
        let max_row = self.cells.keys().map(|(r, _)| *r).max().unwrap_or(1);
        let max_col = self.cells.keys().map(|(_, c)| *c).max().unwrap_or(1);
        let _ = write!(
            xml,
            r#"<dimension ref="A1:{}"/>"#,
            sizegrid::cell_ref::format_cell_ref(max_col, max_row)
        );
        xml.push_str(r#"<sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/>"#);

        if !self.cols.is_empty() {
            xml.push_str("<cols>");
            for (min, max, width, hidden) in &self.cols {
                let _ = write!(
                    xml,
                    r#"<col min="{min}" max="{max}" width="{width}" customWidth="1"{}/>"#,
                    if *hidden { r#" hidden="1""# } else { "" }
                );
            }
            xml.push_str("</cols>");
        }

        xml.push_str("<sheetData>");
        let mut rows: BTreeMap<u32, Vec<(u32, &FixtureCell)>> = BTreeMap::new();
        for (&(row, col), cell) in &self.cells {
            rows.entry(row).or_default().push((col, cell));
        }
        for row in self.row_attrs.keys() {
            rows.entry(*row).or_default();
        }
        for (row, cells) in rows {
            let attrs = self.row_attrs.get(&row).map_or("", String::as_str);
            if cells.is_empty() {
                let _ = write!(xml, r#"<row r="{row}"{attrs}/>"#);
                continue;
            }
            let _ = write!(xml, r#"<row r="{row}"{attrs}>"#);
            for (col, cell) in cells {
                let cell_ref = sizegrid::cell_ref::format_cell_ref(col, row);
                let style = cell.style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
                match &cell.value {
                    Value::Text(text) => {
                        let index = sst.iter().position(|s| s == text).unwrap_or_else(|| {
                            sst.push(text.clone());
                            sst.len() - 1
                        });
                        let _ = write!(xml, r#"<c r="{cell_ref}"{style} t="s"><v>{index}</v></c>"#);
                    }
                    Value::Inline(text) => {
                        let _ = write!(
                            xml,
                            r#"<c r="{cell_ref}"{style} t="inlineStr"><is><t>{}</t></is></c>"#,
                            escape_xml(text)
                        );
                    }
                    Value::Number(n) => {
                        let _ = write!(xml, r#"<c r="{cell_ref}"{style}><v>{n}</v></c>"#);
                    }
                    Value::Blank => {
                        let _ = write!(xml, r#"<c r="{cell_ref}"{style}/>"#);
                    }
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");

        if let Some(range) = &self.auto_filter {
            let _ = write!(xml, r#"<autoFilter ref="{range}"/>"#);
        }
        if !self.merges.is_empty() {
            let _ = write!(xml, r#"<mergeCells count="{}">"#, self.merges.len());
            for merge in &self.merges {
                let _ = write!(xml, r#"<mergeCell ref="{merge}"/>"#);
            }
            xml.push_str("</mergeCells>");
        }
        xml.push_str(r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#);
        if !self.tables.is_empty() {
            let _ = write!(xml, r#"<tableParts count="{}">"#, self.tables.len());
            for i in 1..=self.tables.len() {
                let _ = write!(xml, r#"<tablePart r:id="rId{i}"/>"#);
            }
            xml.push_str("</tableParts>");
        }
        xml.push_str("</worksheet>");
        xml
    }
}

fn table_xml(id: usize, table: &FixtureTable) -> String {
    let range = CellRange::parse(&table.range).expect("valid table range");
    let filter_end = if table.totals_row {
        range.end_row - 1
    } else {
        range.end_row
    };
    let filter = CellRange {
        end_row: filter_end,
        ..range
    };
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="{id}" name="{name}" displayName="{name}" ref="{range}"{totals}><autoFilter ref="{filter}"/>"#,
        name = table.name,
        totals = if table.totals_row {
            r#" totalsRowCount="1""#
        } else {
            r#" totalsRowShown="0""#
        },
    );
    let columns = range.end_col - range.start_col + 1;
    let _ = write!(xml, r#"<tableColumns count="{columns}">"#);
    for i in 1..=columns {
        let _ = write!(xml, r#"<tableColumn id="{i}" name="Column{i}"/>"#);
    }
    xml.push_str(r#"</tableColumns><tableStyleInfo name="TableStyleLight1" showFirstColumn="0" showLastColumn="0" showRowStripes="1" showColumnStripes="0"/></table>"#);
    xml
}

// ============================================================================
// Workbook Builder
// ============================================================================

/// XLSX builder for test fixtures.
#[derive(Debug, Clone, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    active_tab: Option<usize>,
    date1904: bool,
    without_styles: bool,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    #[must_use]
    pub fn active_tab(mut self, index: usize) -> Self {
        self.active_tab = Some(index);
        self
    }

    #[must_use]
    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Leave out `xl/styles.xml`.
    #[must_use]
    pub fn without_styles(mut self) -> Self {
        self.without_styles = true;
        self
    }

    /// Build the XLSX file as bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut sst = Vec::new();
        let sheets: Vec<String> = self.sheets.iter().map(|s| s.build_xml(&mut sst)).collect();

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options =
                FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            let mut put = |path: &str, contents: &str| {
                zip.start_file(path, options).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            };

            put("[Content_Types].xml", &self.build_content_types(!sst.is_empty()));
            put("_rels/.rels", RELS_XML);
            put("docProps/core.xml", CORE_XML);
            put("xl/workbook.xml", &self.build_workbook());
            put("xl/_rels/workbook.xml.rels", &self.build_workbook_rels(!sst.is_empty()));

            let mut table_id = 0;
            for (i, (sheet, xml)) in self.sheets.iter().zip(&sheets).enumerate() {
                put(&format!("xl/worksheets/sheet{}.xml", i + 1), xml);
                if sheet.tables.is_empty() {
                    continue;
                }
                let mut rels = String::from(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
                );
                for (j, table) in sheet.tables.iter().enumerate() {
                    table_id += 1;
                    let _ = write!(
                        rels,
                        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table{table_id}.xml"/>"#,
                        j + 1
                    );
                    put(
                        &format!("xl/tables/table{table_id}.xml"),
                        &table_xml(table_id, table),
                    );
                }
                rels.push_str("</Relationships>");
                put(&format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1), &rels);
            }

            if !sst.is_empty() {
                put("xl/sharedStrings.xml", &build_shared_strings(&sst));
            }
            if !self.without_styles {
                put("xl/styles.xml", STYLES_XML);
            }
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn table_count(&self) -> usize {
        self.sheets.iter().map(|s| s.tables.len()).sum()
    }

    fn build_content_types(&self, has_sst: bool) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
        );
        for i in 1..=self.sheets.len() {
            let _ = write!(
                xml,
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            );
        }
        for i in 1..=self.table_count() {
            let _ = write!(
                xml,
                r#"<Override PartName="/xl/tables/table{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#
            );
        }
        if has_sst {
            xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
        }
        if !self.without_styles {
            xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
        }
        xml.push_str("</Types>");
        xml
    }

    fn build_workbook(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );
        if self.date1904 {
            xml.push_str(r#"<workbookPr date1904="1"/>"#);
        }
        let _ = write!(
            xml,
            r#"<bookViews><workbookView activeTab="{}"/></bookViews><sheets>"#,
            self.active_tab.unwrap_or(0)
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet.name),
                i + 1,
                i + 1
            );
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn build_workbook_rels(&self, has_sst: bool) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            );
        }
        let next = self.sheets.len() + 1;
        if has_sst {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{next}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#
            );
        }
        if !self.without_styles {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
                next + 1
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn build_shared_strings(strings: &[String]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in strings {
        let _ = write!(xml, "<si><t>{}</t></si>", escape_xml(s));
    }
    xml.push_str("</sst>");
    xml
}

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// Order templates
// ============================================================================

/// The order form used across the pipeline tests.
///
/// Header on row 5: `Sold To` (A), `Ship To` (B), `Material Number` (C),
/// a `Notes` column (D) and sizes `M`, `L`, `XL` in F..H. Rows 6..=`last_row`
/// are pre-formatted with grid borders and a 20pt height; D carries a note on
/// row 6 that the fill must not touch.
pub fn order_template(last_row: u32) -> SheetBuilder {
    let mut sheet = SheetBuilder::new("Order")
        .text("A1", "Purchase order")
        .merge("A1:H1")
        .styled("A5", "Sold To", STYLE_HEADER)
        .styled("B5", "Ship To", STYLE_HEADER)
        .styled("C5", "Material Number", STYLE_HEADER)
        .styled("D5", "Notes", STYLE_HEADER)
        .styled("F5", "M", STYLE_HEADER)
        .styled("G5", "L", STYLE_HEADER)
        .styled("H5", "XL", STYLE_HEADER)
        .col(3, 3, 18.0, false)
        .col(6, 8, 6.5, false);
    if last_row >= 6 {
        sheet = sheet
            .styled_range(&format!("A6:H{last_row}"), STYLE_GRID)
            .styled("F6", Value::Blank, STYLE_SHADED)
            .styled("D6", Value::Inline("do not ship before May".into()), STYLE_GRID);
        for row in 6..=last_row {
            sheet = sheet.row_height(row, 20.0);
        }
    }
    sheet
}
