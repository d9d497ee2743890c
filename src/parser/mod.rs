//! XLSX package reading.
//!
//! [`Workbook::open`] reads the package-level parts (relationships, sheet
//! list, shared strings, stylesheet) once; individual sheets and their table
//! parts are parsed on demand.

mod relationships;
mod worksheet;

use std::io::Cursor;
use zip::ZipArchive;

use crate::error::{Result, SizegridError};
use crate::styles::StyleBook;
use crate::tables::TablePart;
use crate::types::SheetDocument;

use relationships::{
    parse_relationships, parse_shared_strings, parse_workbook_info, read_part, rels_path_for,
    SheetInfo,
};
use worksheet::{parse_sheet, ValueContext};

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// An opened XLSX package.
#[derive(Debug, Clone)]
pub struct Workbook {
    bytes: Vec<u8>,
    sheets: Vec<SheetInfo>,
    active_tab: usize,
    date1904: bool,
    shared_strings: Vec<String>,
    styles: StyleBook,
}

impl Workbook {
    /// Open an XLSX file from its bytes.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| SizegridError::MissingPart(WORKBOOK_PART.to_string()))?;
        let rels = match read_part(&mut archive, &rels_path_for(WORKBOOK_PART))? {
            Some(xml) => parse_relationships(&xml, WORKBOOK_PART)?,
            None => Vec::new(),
        };
        let info = parse_workbook_info(&workbook_xml, &rels)?;
        if info.sheets.is_empty() {
            return Err(SizegridError::Parse("workbook has no sheets".into()));
        }

        let shared_strings_path = rels
            .iter()
            .find(|r| r.is_kind("sharedStrings"))
            .map_or("xl/sharedStrings.xml", |r| r.target.as_str());
        let shared_strings = match read_part(&mut archive, shared_strings_path)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let styles_path = rels
            .iter()
            .find(|r| r.is_kind("styles"))
            .map_or("xl/styles.xml", |r| r.target.as_str());
        let styles = match read_part(&mut archive, styles_path)? {
            Some(xml) => StyleBook::parse(styles_path, xml)?,
            None => StyleBook::default(),
        };
        drop(archive);

        tracing::debug!(
            "Opened workbook: {} sheets, {} shared strings, date1904={}",
            info.sheets.len(),
            shared_strings.len(),
            info.date1904
        );

        Ok(Self {
            bytes,
            sheets: info.sheets,
            active_tab: info.active_tab,
            date1904: info.date1904,
            shared_strings,
            styles,
        })
    }

    /// The original package bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn date1904(&self) -> bool {
        self.date1904
    }

    pub fn styles(&self) -> &StyleBook {
        &self.styles
    }

    /// Index of the sheet active when the workbook was saved.
    pub fn active_sheet_index(&self) -> usize {
        if self.active_tab < self.sheets.len() {
            self.active_tab
        } else {
            0
        }
    }

    /// Pick a sheet by name, falling back to the active sheet.
    pub fn target_sheet_index(&self, name: Option<&str>) -> Result<usize> {
        match name {
            Some(name) => self
                .sheets
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| SizegridError::SheetNotFound(name.to_string())),
            None => Ok(self.active_sheet_index()),
        }
    }

    /// Parse one worksheet into an editable document.
    pub fn load_sheet(&self, index: usize) -> Result<SheetDocument> {
        let info = self
            .sheets
            .get(index)
            .ok_or_else(|| SizegridError::SheetNotFound(format!("#{index}")))?;
        let xml = self
            .read_part(&info.path)?
            .ok_or_else(|| SizegridError::MissingPart(info.path.clone()))?;
        let ctx = ValueContext {
            shared_strings: &self.shared_strings,
            styles: &self.styles,
            date1904: self.date1904,
        };
        parse_sheet(info, xml, &ctx)
    }

    /// Table parts attached to a worksheet.
    pub fn table_parts(&self, index: usize) -> Result<Vec<TablePart>> {
        let Some(info) = self.sheets.get(index) else {
            return Ok(Vec::new());
        };
        let Some(rels_xml) = self.read_part(&rels_path_for(&info.path))? else {
            return Ok(Vec::new());
        };

        let mut tables = Vec::new();
        for rel in parse_relationships(&rels_xml, &info.path)?
            .iter()
            .filter(|r| r.is_kind("table"))
        {
            match self.read_part(&rel.target)? {
                Some(xml) => tables.push(TablePart::parse(&rel.target, xml)?),
                None => tracing::warn!("Table part {} is referenced but missing", rel.target),
            }
        }
        Ok(tables)
    }

    /// Read any package part as text.
    pub fn read_part(&self, path: &str) -> Result<Option<String>> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        read_part(&mut archive, path)
    }
}

/// Parse worksheet XML directly, for unit tests of modules downstream of the parser.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn parse_sheet_for_tests(xml: &str, styles: &StyleBook) -> SheetDocument {
    let info = SheetInfo {
        name: "Sheet1".to_string(),
        path: "xl/worksheets/sheet1.xml".to_string(),
    };
    let ctx = ValueContext {
        shared_strings: &[],
        styles,
        date1904: false,
    };
    parse_sheet(&info, xml.to_string(), &ctx).unwrap()
}
