//! Patch an XLSX ZIP archive with replacement parts.
//!
//! Unmodified entries are copied via `raw_copy_file` (zero recompression cost),
//! so every part the fill does not own stays byte-identical.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, SizegridError};

/// Rebuild `original_data`, swapping in the parts named in `replacements`.
///
/// Every replacement must name an existing entry; entry order is preserved.
pub(crate) fn patch_zip(
    original_data: &[u8],
    replacements: &BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(original_data))?;

    if let Some(missing) = replacements
        .keys()
        .find(|path| !archive.file_names().any(|name| name == path.as_str()))
    {
        return Err(SizegridError::MissingPart(missing.clone()));
    }

    let buf: Vec<u8> = Vec::with_capacity(original_data.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if let Some(contents) = replacements.get(&name) {
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(name.as_str(), options)?;
            writer.write_all(contents)?;
            tracing::debug!("Replaced part {name} ({} bytes)", contents.len());
            continue;
        }

        // Pass through unmodified entry (raw copy, no re-compression)
        writer.raw_copy_file(entry)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
