use std::collections::HashMap;

use crate::error::TabError;
use crate::types::{Result, Row};

use super::xml::{attr_value, decode_text, XmlScanner};
use super::zip::ZipArchive;
use super::SheetSelector;

const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// A selected sheet, resolved through the workbook relationships, plus the
/// shared-strings table its cells index into.
#[derive(Debug, Default)]
pub struct SheetLocation {
    pub sheet_path: String,
    pub shared_strings: Vec<String>,
}

/// Resolves the selected sheet: relationships, workbook sheet list, shared
/// strings. Fails when the workbook structure is missing or the selector
/// matches nothing.
pub fn resolve_sheet(zip: &mut ZipArchive, sheet: &SheetSelector) -> Result<SheetLocation> {
    if !zip.contains(WORKBOOK_RELS_PART) {
        return Err(TabError::Workbook(format!("missing {WORKBOOK_RELS_PART}")));
    }
    let rels_xml = zip.read_file(WORKBOOK_RELS_PART)?;
    let rels = parse_relationships(&rels_xml);

    if !zip.contains(WORKBOOK_PART) {
        return Err(TabError::Workbook(format!("missing {WORKBOOK_PART}")));
    }
    let workbook_xml = zip.read_file(WORKBOOK_PART)?;
    let sheets = parse_sheet_list(&workbook_xml, &rels);
    if sheets.is_empty() {
        return Err(TabError::Workbook("no sheets in workbook".to_owned()));
    }

    let sheet_path = match sheet {
        SheetSelector::Name(name) => sheets
            .iter()
            .find(|(sheet_name, _)| sheet_name == name)
            .map(|(_, path)| path.clone())
            .ok_or_else(|| TabError::SheetNotFound(name.clone()))?,
        SheetSelector::Index(index) => {
            let zero_based = index.saturating_sub(1);
            sheets
                .get(zero_based)
                .map(|(_, path)| path.clone())
                .ok_or_else(|| TabError::Workbook("sheet index out of range".to_owned()))?
        }
    };

    let shared_strings = if zip.contains(SHARED_STRINGS_PART) {
        parse_shared_strings(&zip.read_file(SHARED_STRINGS_PART)?)
    } else {
        Vec::new()
    };

    Ok(SheetLocation {
        sheet_path,
        shared_strings,
    })
}

/// `workbook.xml.rels`: relationship id to archive path, normalised under
/// `xl/`.
pub fn parse_relationships(xml: &[u8]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let mut scanner = XmlScanner::new(xml);
    while let Some(tag) = scanner.next_tag() {
        if tag.closing || tag.name != b"Relationship" {
            continue;
        }
        let (Some(id), Some(target)) = (
            attr_value(tag.attrs, b"Id"),
            attr_value(tag.attrs, b"Target"),
        ) else {
            continue;
        };
        let target = decode_text(target);
        let normalised = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_owned(),
            None => format!("xl/{target}"),
        };
        out.insert(decode_text(id), normalised);
    }
    out
}

/// `workbook.xml`: ordered `(sheet name, archive path)` pairs, resolved
/// through the relationship map. Sheets with unknown relationship ids are
/// dropped.
pub fn parse_sheet_list(xml: &[u8], rels: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut scanner = XmlScanner::new(xml);
    while let Some(tag) = scanner.next_tag() {
        if tag.closing || tag.name != b"sheet" {
            continue;
        }
        let name = attr_value(tag.attrs, b"name").map(decode_text).unwrap_or_default();
        let rid = attr_value(tag.attrs, b"r:id")
            .or_else(|| attr_value(tag.attrs, b"id"))
            .map(decode_text);
        if let Some(path) = rid.as_deref().and_then(|rid| rels.get(rid)) {
            out.push((name, path.clone()));
        }
    }
    out
}

/// `sharedStrings.xml`: one string per `<si>`, concatenating the `<t>` runs
/// of rich-text items.
pub fn parse_shared_strings(xml: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut scanner = XmlScanner::new(xml);
    let mut current: Option<String> = None;
    while let Some(tag) = scanner.next_tag() {
        match tag.name {
            b"si" if !tag.closing => {
                if tag.self_closing {
                    out.push(String::new());
                } else {
                    current = Some(String::new());
                }
            }
            b"si" => {
                if let Some(item) = current.take() {
                    out.push(item);
                }
            }
            b"t" if !tag.closing && !tag.self_closing => {
                if let Some(item) = current.as_mut() {
                    item.push_str(&decode_text(scanner.read_text()));
                }
            }
            _ => {}
        }
    }
    out
}

/// `A1` → 0, `B2` → 1, `BC23` → 54: the 0-based column of a cell reference.
pub fn column_of_cell_ref(cell_ref: &[u8]) -> Option<usize> {
    let letters_end = cell_ref
        .iter()
        .position(|b| !b.is_ascii_alphabetic())
        .unwrap_or(cell_ref.len());
    if letters_end == 0 {
        return None;
    }
    let mut column = 0usize;
    for &b in &cell_ref[..letters_end] {
        column = column * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize;
    }
    Some(column - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Bool,
    Plain,
}

struct PendingCell {
    column: usize,
    kind: CellKind,
    value: Option<String>,
}

/// Streams sheet rows in document order. Sparse cells are padded with empty
/// strings up to the max column seen in the row; shared-string and boolean
/// cells are resolved to their display values. `on_row` returning false stops
/// the walk.
pub fn stream_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
    mut on_row: impl FnMut(Row) -> bool,
) {
    let mut scanner = XmlScanner::new(xml);
    let mut in_row = false;
    let mut cells: Vec<(usize, String)> = Vec::new();
    let mut max_column: Option<usize> = None;
    let mut pending: Option<PendingCell> = None;

    while let Some(tag) = scanner.next_tag() {
        match tag.name {
            b"row" if !tag.closing => {
                cells.clear();
                max_column = None;
                pending = None;
                in_row = !tag.self_closing;
            }
            b"row" => {
                if let Some(cell) = pending.take() {
                    cells.push(finish_cell(cell, shared_strings));
                }
                if in_row {
                    if let Some(max_column) = max_column {
                        let mut row = vec![String::new(); max_column + 1];
                        for (column, value) in cells.drain(..) {
                            if column <= max_column {
                                row[column] = value;
                            }
                        }
                        if !on_row(row) {
                            return;
                        }
                    }
                }
                in_row = false;
            }
            b"c" if in_row && !tag.closing => {
                if let Some(cell) = pending.take() {
                    cells.push(finish_cell(cell, shared_strings));
                }
                let Some(column) = attr_value(tag.attrs, b"r").and_then(column_of_cell_ref) else {
                    continue;
                };
                max_column = Some(max_column.map_or(column, |m| m.max(column)));
                let kind = match attr_value(tag.attrs, b"t") {
                    Some(b"s") => CellKind::Shared,
                    Some(b"b") => CellKind::Bool,
                    _ => CellKind::Plain,
                };
                let cell = PendingCell {
                    column,
                    kind,
                    value: None,
                };
                if tag.self_closing {
                    cells.push(finish_cell(cell, shared_strings));
                } else {
                    pending = Some(cell);
                }
            }
            b"c" => {
                if let Some(cell) = pending.take() {
                    cells.push(finish_cell(cell, shared_strings));
                }
            }
            b"v" if !tag.closing && !tag.self_closing => {
                if let Some(cell) = pending.as_mut() {
                    cell.value = Some(decode_text(scanner.read_text()));
                }
            }
            b"t" if !tag.closing && !tag.self_closing => {
                // Inline string run (<is><t>…</t></is>).
                if let Some(cell) = pending.as_mut() {
                    if cell.value.is_none() {
                        cell.value = Some(decode_text(scanner.read_text()));
                    }
                }
            }
            _ => {}
        }
    }
}

fn finish_cell(cell: PendingCell, shared_strings: &[String]) -> (usize, String) {
    let raw = cell.value.unwrap_or_default();
    let value = match cell.kind {
        CellKind::Shared => match raw.parse::<usize>() {
            // An out-of-range index keeps its raw text.
            Ok(index) => shared_strings.get(index).cloned().unwrap_or(raw),
            Err(_) => raw,
        },
        CellKind::Bool => {
            if raw == "1" || raw == "true" || raw == "TRUE" {
                "true".to_owned()
            } else {
                "false".to_owned()
            }
        }
        CellKind::Plain => raw,
    };
    (cell.column, value)
}
