//! XLSX export pipeline.
//!
//! Produces the filled XLSX by patching the template's ZIP archive. Only the
//! worksheet, and the stylesheet and table parts when they changed, are
//! re-serialized; everything else is passed through byte-identical.

pub(crate) mod sheet_writer;
pub(crate) mod zip_patcher;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::styles::StyleBook;
use crate::types::SheetDocument;

/// Parts of the package the fill has rewritten.
#[derive(Debug, Default)]
pub(crate) struct PackageEdits<'a> {
    pub sheet: Option<&'a SheetDocument>,
    pub styles: Option<&'a StyleBook>,
    /// `(path, xml)` of rewritten table parts.
    pub tables: Vec<(String, String)>,
}

/// Save the edited package to XLSX bytes.
///
/// `original_bytes` is the template data (needed for the ZIP round trip).
pub(crate) fn save_xlsx(original_bytes: &[u8], edits: &PackageEdits<'_>) -> Result<Vec<u8>> {
    let mut replacements: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    if let Some(sheet) = edits.sheet {
        let xml = sheet_writer::write_sheet_xml(sheet)?;
        replacements.insert(sheet.path.clone(), xml.into_bytes());
    }
    if let Some(styles) = edits.styles {
        if let (Some(path), Some(xml)) = (styles.path(), styles.to_xml()) {
            replacements.insert(path.to_string(), xml.into_bytes());
        }
    }
    for (path, xml) in &edits.tables {
        replacements.insert(path.clone(), xml.clone().into_bytes());
    }

    if replacements.is_empty() {
        // Nothing changed; return original bytes
        return Ok(original_bytes.to_vec());
    }

    zip_patcher::patch_zip(original_bytes, &replacements)
}
