//! The embedded spreadsheet behind a chart, opened as a package of its own.

use super::{cell_ref, format_number, ChartData};
use crate::error::{DeckMergeError, Result};
use crate::package::relationships::relationship_types as rt;
use crate::package::{OoxmlPackage, Part, PartRole};
use crate::xml::namespaces::{R, S};
use crate::xml::parser::parse;
use crate::xml::xname::XML_NS;
use crate::xml::{XAttribute, XName, XmlDocument, XmlNodeData};
use indextree::NodeId;
use log::debug;
use std::collections::BTreeMap;

const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

const EMPTY_SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="0" uniqueCount="0"/>"#;

#[derive(Debug, Clone)]
pub struct WorkbookUpdate {
    pub bytes: Vec<u8>,
    /// Sheet the data was written to.
    pub sheet: String,
    pub strings_appended: usize,
}

/// Cell values of one sheet, with shared strings resolved.
#[derive(Debug, Clone, Default)]
pub struct WorkbookGrid {
    pub sheet: String,
    pub cells: BTreeMap<(usize, usize), String>,
    pub shared_strings: Vec<String>,
}

impl WorkbookGrid {
    pub fn cell(&self, row: usize, column: usize) -> Option<String> {
        self.cells.get(&(row, column)).cloned()
    }
}

/// Append-only view over a `sst` part: indices handed out stay valid for
/// the rest of the session because nothing is ever reordered or merged.
struct SharedStrings<'a> {
    doc: &'a mut XmlDocument,
    root: NodeId,
    appended: usize,
}

impl<'a> SharedStrings<'a> {
    fn open(doc: &'a mut XmlDocument) -> Result<Self> {
        let root = doc
            .root()
            .ok_or_else(|| DeckMergeError::malformed("shared string table is empty"))?;
        Ok(Self {
            doc,
            root,
            appended: 0,
        })
    }

    fn len(&self) -> usize {
        self.doc.elements_by_name(self.root, &S::si()).count()
    }

    fn append(&mut self, text: &str) -> usize {
        let index = self.len();
        let si = self.doc.add_child(self.root, XmlNodeData::element(S::si()));
        let mut attrs = Vec::new();
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            attrs.push(XAttribute::new(XName::new(XML_NS, "space"), "preserve"));
        }
        let t = self.doc.add_child(si, XmlNodeData::element_with_attrs(S::t(), attrs));
        self.doc.add_child(t, XmlNodeData::text(text));
        self.appended += 1;
        index
    }

    fn finish(self) -> usize {
        let count = self.len().to_string();
        self.doc.set_attribute(self.root, &XName::local("count"), &count);
        self.doc.set_attribute(self.root, &XName::local("uniqueCount"), &count);
        self.appended
    }
}

fn read_shared_strings(doc: &XmlDocument) -> Vec<String> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    doc.elements_by_name(root, &S::si())
        .map(|si| {
            doc.descendants(si)
                .filter(|&n| doc.is(n, &S::t()))
                .map(|t| doc.text(t))
                .collect()
        })
        .collect()
}

/// `(name, worksheet path)` of the sheet called `preferred`, else the first sheet.
fn find_sheet(wb: &OoxmlPackage, workbook_part: &str, preferred: &str) -> Result<(String, String)> {
    let doc = wb.xml(workbook_part)?;
    let root = doc
        .root()
        .ok_or_else(|| DeckMergeError::malformed(format!("'{workbook_part}' is empty")))?;
    let sheets: Vec<(String, String)> = doc
        .find_child(root, &S::sheets())
        .map(|list| {
            doc.elements_by_name(list, &S::sheet())
                .filter_map(|sheet| {
                    let name = doc.local_attribute(sheet, "name")?.to_string();
                    let rel_id = doc.attribute(sheet, &R::id())?;
                    Some((name, wb.target_of(workbook_part, rel_id)?))
                })
                .collect()
        })
        .unwrap_or_default();
    sheets
        .iter()
        .find(|(name, _)| name == preferred)
        .or_else(|| sheets.first())
        .cloned()
        .ok_or_else(|| DeckMergeError::ChartData {
            message: "embedded workbook has no worksheet".to_string(),
        })
}

fn ensure_shared_strings(wb: &mut OoxmlPackage, workbook_part: &str) -> Result<String> {
    let existing = wb
        .internal_targets(workbook_part)
        .into_iter()
        .find(|(rel, _)| rel.rel_type == rt::SHARED_STRINGS)
        .map(|(_, target)| target);
    if let Some(path) = existing {
        return Ok(path);
    }
    let doc = parse(EMPTY_SHARED_STRINGS)?;
    wb.add_part(Part::xml(SHARED_STRINGS_PATH, PartRole::SharedStrings, doc))?;
    wb.add_relationship(workbook_part, rt::SHARED_STRINGS, SHARED_STRINGS_PATH)?;
    Ok(SHARED_STRINGS_PATH.to_string())
}

fn add_cell(doc: &mut XmlDocument, row: NodeId, reference: &str, shared: Option<usize>, number: Option<&str>) {
    let mut attrs = vec![XAttribute::new(XName::local("r"), reference)];
    if shared.is_some() {
        attrs.push(XAttribute::new(XName::local("t"), "s"));
    }
    let cell = doc.add_child(row, XmlNodeData::element_with_attrs(S::c(), attrs));
    let value = shared.map(|i| i.to_string()).or(number.map(str::to_string));
    if let Some(value) = value {
        let v = doc.add_child(cell, XmlNodeData::element(S::v()));
        doc.add_child(v, XmlNodeData::text(&value));
    }
}

/// Lays the grid out on the sheet: labels down column A from row 2, series
/// names across row 1 from column B, values in the block between.
fn write_sheet(
    doc: &mut XmlDocument,
    data: &ChartData,
    strings: &mut SharedStrings<'_>,
    header: Option<&str>,
) -> Result<()> {
    let root = doc
        .root()
        .ok_or_else(|| DeckMergeError::malformed("worksheet is empty"))?;
    let sheet_data = doc.get_or_add_child(root, &S::sheetData());
    let stale: Vec<NodeId> = doc.children(sheet_data).collect();
    for node in stale {
        doc.remove(node);
    }

    let last_cell = cell_ref(data.categories.len(), data.series.len());
    if let Some(dimension) = doc.find_child(root, &S::dimension()) {
        doc.set_attribute(dimension, &XName::local("ref"), &format!("A1:{last_cell}"));
    }

    let span = format!("1:{}", data.series.len() + 1);
    let new_row = |doc: &mut XmlDocument, index: usize| {
        doc.add_child(
            sheet_data,
            XmlNodeData::element_with_attrs(
                S::row(),
                vec![
                    XAttribute::new(XName::local("r"), &(index + 1).to_string()),
                    XAttribute::new(XName::local("spans"), &span),
                ],
            ),
        )
    };

    let header_row = new_row(doc, 0);
    if let Some(header) = header {
        let index = strings.append(header);
        add_cell(doc, header_row, &cell_ref(0, 0), Some(index), None);
    }
    for (s, series) in data.series.iter().enumerate() {
        let index = strings.append(&series.label);
        add_cell(doc, header_row, &cell_ref(0, s + 1), Some(index), None);
    }

    for (c, category) in data.categories.iter().enumerate() {
        let row = new_row(doc, c + 1);
        let index = strings.append(&category.label);
        add_cell(doc, row, &cell_ref(c + 1, 0), Some(index), None);
        for (s, value) in category.values.iter().enumerate() {
            add_cell(doc, row, &cell_ref(c + 1, s + 1), None, Some(&format_number(*value)));
        }
    }
    Ok(())
}

/// Resizes a table definition to the grid and renames its columns after the series.
fn update_table(doc: &mut XmlDocument, data: &ChartData) -> Result<String> {
    let root = doc
        .root()
        .ok_or_else(|| DeckMergeError::malformed("table part is empty"))?;
    let reference = format!("A1:{}", cell_ref(data.categories.len(), data.series.len()));
    doc.set_attribute(root, &XName::local("ref"), &reference);
    if let Some(filter) = doc.find_child(root, &S::autoFilter()) {
        doc.set_attribute(filter, &XName::local("ref"), &reference);
    }

    let columns = doc.get_or_add_child(root, &S::tableColumns());
    let existing: Vec<NodeId> = doc.elements_by_name(columns, &S::tableColumn()).collect();
    let first_name = existing
        .first()
        .and_then(|&c| doc.local_attribute(c, "name"))
        .filter(|n| !n.is_empty())
        .unwrap_or(" ")
        .to_string();
    for node in existing {
        doc.remove(node);
    }

    let names = std::iter::once(first_name.as_str()).chain(data.series.iter().map(|s| s.label.as_str()));
    let mut count = 0;
    for (i, name) in names.enumerate() {
        doc.add_child(
            columns,
            XmlNodeData::element_with_attrs(
                S::tableColumn(),
                vec![
                    XAttribute::new(XName::local("id"), &(i + 1).to_string()),
                    XAttribute::new(XName::local("name"), name),
                ],
            ),
        );
        count += 1;
    }
    doc.set_attribute(columns, &XName::local("count"), &count.to_string());
    Ok(first_name)
}

/// Mirrors `data` into the embedded workbook `bytes` and returns the new archive.
pub fn write_workbook(name: &str, bytes: &[u8], data: &ChartData, preferred_sheet: &str) -> Result<WorkbookUpdate> {
    let mut wb = OoxmlPackage::open_named(name, bytes)?;
    let workbook_part = wb.main_part_path()?;
    let (sheet, sheet_path) = find_sheet(&wb, &workbook_part, preferred_sheet)?;
    let strings_path = ensure_shared_strings(&mut wb, &workbook_part)?;

    let tables: Vec<String> = wb
        .internal_targets(&sheet_path)
        .into_iter()
        .filter(|(rel, _)| rel.rel_type == rt::TABLE)
        .map(|(_, target)| target)
        .collect();
    let mut header = None;
    for table in &tables {
        let first_column = update_table(wb.xml_mut(table)?, data)?;
        header.get_or_insert(first_column);
    }

    // Worksheet and shared strings are distinct parts; edit copies and store them back.
    let mut strings_doc = wb.xml(&strings_path)?.clone();
    let mut sheet_doc = wb.xml(&sheet_path)?.clone();
    let appended = {
        let mut strings = SharedStrings::open(&mut strings_doc)?;
        write_sheet(&mut sheet_doc, data, &mut strings, header.as_deref())?;
        strings.finish()
    };
    *wb.xml_mut(&strings_path)? = strings_doc;
    *wb.xml_mut(&sheet_path)? = sheet_doc;

    debug!("{name}: wrote {appended} shared strings to sheet '{sheet}'");
    Ok(WorkbookUpdate {
        bytes: wb.save()?,
        sheet,
        strings_appended: appended,
    })
}

fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let column = letters.bytes().try_fold(0usize, |acc, b| {
        if !b.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)
    })?;
    let row: usize = digits.parse().ok()?;
    Some((row.checked_sub(1)?, column.checked_sub(1)?))
}

/// Reads the first sheet of an embedded workbook.
pub fn read_workbook(name: &str, bytes: &[u8]) -> Result<WorkbookGrid> {
    let wb = OoxmlPackage::open_named(name, bytes)?;
    let workbook_part = wb.main_part_path()?;
    let (sheet, sheet_path) = find_sheet(&wb, &workbook_part, "")?;
    let shared_strings = wb
        .internal_targets(&workbook_part)
        .into_iter()
        .find(|(rel, _)| rel.rel_type == rt::SHARED_STRINGS)
        .map(|(_, target)| wb.xml(&target).map(read_shared_strings))
        .transpose()?
        .unwrap_or_default();

    let doc = wb.xml(&sheet_path)?;
    let mut cells = BTreeMap::new();
    if let Some(root) = doc.root() {
        for cell in doc.descendants_named(root, &S::c()) {
            let Some(position) = doc.local_attribute(cell, "r").and_then(parse_cell_ref) else {
                continue;
            };
            let Some(raw) = doc.find_child(cell, &S::v()).map(|v| doc.text(v)) else {
                continue;
            };
            let value = match doc.local_attribute(cell, "t") {
                Some("s") => raw
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| shared_strings.get(i).cloned())
                    .unwrap_or_default(),
                _ => raw,
            };
            cells.insert(position, value);
        }
    }
    Ok(WorkbookGrid {
        sheet,
        cells,
        shared_strings,
    })
}
