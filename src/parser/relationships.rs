//! Package plumbing: part relationships, workbook sheet list, shared strings.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::Result;
use crate::xml_helpers::{attr_bool, attr_string, attr_string_local, attr_u32};

/// One `<Relationship>` of a `.rels` part, with its target resolved to a
/// package path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    /// Whether the relationship type ends with `/{kind}` (e.g. `worksheet`).
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|last| last == kind)
    }
}

/// Sheet metadata from `xl/workbook.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetInfo {
    pub name: String,
    pub path: String,
}

/// What the package knows about its sheets before any sheet is parsed.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkbookInfo {
    pub sheets: Vec<SheetInfo>,
    /// Index of the sheet selected when the workbook was last saved.
    pub active_tab: usize,
    pub date1904: bool,
}

/// Read a package part as UTF-8 text. `Ok(None)` if the part is absent.
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(Some(contents))
}

/// Path of the `.rels` part describing `part_path`.
///
/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
pub(crate) fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part.
///
/// Absolute targets (`/xl/...`) are taken from the package root; `..`
/// segments are collapsed.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        let base = source_part.rsplit_once('/').map_or("", |(dir, _)| dir);
        if base.is_empty() {
            target.to_string()
        } else {
            format!("{base}/{target}")
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Parse a `.rels` part. `source_part` is the part the relationships belong to.
pub(crate) fn parse_relationships(xml: &str, source_part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr_string(e, b"Id").unwrap_or_default();
                let rel_type = attr_string(e, b"Type").unwrap_or_default();
                let target = attr_string(e, b"Target").unwrap_or_default();
                let external = attr_string(e, b"TargetMode").is_some_and(|m| m == "External");
                if id.is_empty() || target.is_empty() || external {
                    continue;
                }
                rels.push(Relationship {
                    id,
                    rel_type,
                    target: resolve_target(source_part, &target),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Parse `xl/workbook.xml` into the sheet list, active tab and date system.
pub(crate) fn parse_workbook_info(xml: &str, rels: &[Relationship]) -> Result<WorkbookInfo> {
    let by_id: HashMap<&str, &str> = rels
        .iter()
        .map(|r| (r.id.as_str(), r.target.as_str()))
        .collect();

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut info = WorkbookInfo::default();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    info.date1904 = attr_bool(e, b"date1904").unwrap_or(false);
                }
                b"workbookView" => {
                    if let Some(tab) = attr_u32(e, b"activeTab") {
                        info.active_tab = usize::try_from(tab).unwrap_or(0);
                    }
                }
                b"sheet" => {
                    let Some(name) = attr_string(e, b"name") else {
                        continue;
                    };
                    let r_id = attr_string_local(e, b"id").unwrap_or_default();
                    let path = by_id.get(r_id.as_str()).map_or_else(
                        || format!("xl/worksheets/sheet{}.xml", info.sheets.len() + 1),
                        |p| (*p).to_string(),
                    );
                    info.sheets.push(SheetInfo { name, path });
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(info)
}

/// Parse the shared string table.
///
/// Rich-text runs are concatenated; phonetic guides (`rPh`) are skipped.
pub(crate) fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::Text(ref e) if in_t => {
                current.push_str(&e.unescape()?);
            }
            Event::CData(ref e) if in_t => {
                current.push_str(&String::from_utf8_lossy(e));
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}
