//! Sheet layout that calamine does not expose: merged ranges and column
//! widths, read straight from the worksheet XML inside the xlsx package.

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use smeta_engine::{CellRef, MergedRange};
use zip::ZipArchive;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub merges: Vec<MergedRange>,
    /// 0-based column → width in characters, for every `<col>` with a width.
    pub col_widths: HashMap<u32, f64>,
    /// Bottom-right cell of `<dimension ref>`. Counts styled empty cells
    /// that carry no value.
    pub dimension_end: Option<CellRef>,
}

// =============================================================================
// Worksheet XML parser
// =============================================================================

pub fn parse_sheet_layout(xml: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"col" => {
                    let mut min_col: Option<u32> = None;
                    let mut max_col: Option<u32> = None;
                    let mut width: Option<f64> = None;

                    for attr in e.attributes().flatten() {
                        let value = std::str::from_utf8(&attr.value).ok();
                        match attr.key.as_ref() {
                            b"min" => min_col = value.and_then(|s| s.parse::<u32>().ok()),
                            b"max" => max_col = value.and_then(|s| s.parse::<u32>().ok()),
                            b"width" => width = value.and_then(|s| s.parse().ok()),
                            _ => {}
                        }
                    }

                    // min/max are 1-based
                    if let (Some(min), Some(max), Some(w)) = (min_col, max_col, width) {
                        for col in min.max(1)..=max.min(16_384) {
                            layout.col_widths.insert(col - 1, w);
                        }
                    }
                }
                b"dimension" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            let ref_str = String::from_utf8_lossy(&attr.value);
                            let end = ref_str.rsplit(':').next().unwrap_or_default();
                            layout.dimension_end = CellRef::parse(end);
                        }
                    }
                }
                b"mergeCell" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            let ref_str = String::from_utf8_lossy(&attr.value);
                            if let Some(range) = MergedRange::parse(&ref_str) {
                                layout.merges.push(range);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    layout
}

/// Layout of the first worksheet in an xlsx package.
pub fn read_first_sheet_layout<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<SheetLayout, String> {
    let workbook_xml = read_zip_file(archive, "xl/workbook.xml")?;
    let rels_xml = read_zip_file(archive, "xl/_rels/workbook.xml.rels")?;
    let path = first_worksheet_path(&workbook_xml, &rels_xml)
        .ok_or_else(|| "workbook lists no worksheets".to_string())?;
    let sheet_xml = read_zip_file(archive, &path)?;
    Ok(parse_sheet_layout(&sheet_xml))
}

// =============================================================================
// Helpers
// =============================================================================

/// Read a file from a ZIP archive.
fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("'{}' not found in xlsx: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Package path of the first `<sheet>` in workbook.xml, via its relationship.
fn first_worksheet_path(workbook_xml: &str, rels_xml: &str) -> Option<String> {
    let rid = first_sheet_rid(workbook_xml)?;
    let rid_to_target = relationship_targets(rels_xml);
    let target = rid_to_target.get(&rid)?;
    // Targets are relative to xl/ unless absolute within the package
    Some(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    })
}

/// Namespaces a sheet's relationship id attribute may live in
/// (transitional and strict OOXML).
const RELATIONSHIP_NAMESPACES: [&[u8]; 2] = [
    b"http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    b"http://purl.oclc.org/ooxml/officeDocument/relationships",
];

/// Relationship id of the first `<sheet>`. The id attribute is found by local
/// name under any prefix bound to the relationships namespace; `r` is
/// accepted undeclared.
fn first_sheet_rid(workbook_xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut rel_prefixes: Vec<Vec<u8>> = vec![b"r".to_vec()];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                for attr in e.attributes().flatten() {
                    if let Some(prefix) = attr.key.as_ref().strip_prefix(b"xmlns:") {
                        if RELATIONSHIP_NAMESPACES.contains(&&*attr.value) {
                            rel_prefixes.push(prefix.to_vec());
                        }
                    }
                }
                if e.local_name().as_ref() == b"sheet" {
                    for attr in e.attributes().flatten() {
                        let bound = attr
                            .key
                            .prefix()
                            .map_or(false, |p| rel_prefixes.iter().any(|r| r.as_slice() == p.as_ref()));
                        if bound && attr.key.local_name().as_ref() == b"id" {
                            return Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn relationship_targets(rels_xml: &str) -> HashMap<String, String> {
    let mut rid_to_target = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"Target" => target = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rid_to_target.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rid_to_target
}

// =============================================================================
// Tests
// =============================================================================
