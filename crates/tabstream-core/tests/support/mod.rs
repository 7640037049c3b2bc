#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Writes `contents` to a fresh file inside `dir` and returns its path.
pub fn write_fixture(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Builds a ZIP archive in memory using stored (uncompressed) entries. Our
/// reader ignores CRCs, so they are written as zero.
pub fn zip_stored(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data) in entries {
        let header_offset = out.len() as u32;
        let name = name.as_bytes();

        // Local file header.
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // method: stored
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra len
        out.extend_from_slice(name);
        out.extend_from_slice(data);

        // Central directory record.
        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes()); // version made by
        central.extend_from_slice(&20u16.to_le_bytes()); // version needed
        central.extend_from_slice(&0u16.to_le_bytes()); // flags
        central.extend_from_slice(&0u16.to_le_bytes()); // method
        central.extend_from_slice(&0u16.to_le_bytes()); // mod time
        central.extend_from_slice(&0u16.to_le_bytes()); // mod date
        central.extend_from_slice(&0u32.to_le_bytes()); // crc32
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // extra len
        central.extend_from_slice(&0u16.to_le_bytes()); // comment len
        central.extend_from_slice(&0u16.to_le_bytes()); // disk number
        central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        central.extend_from_slice(&header_offset.to_le_bytes());
        central.extend_from_slice(name);
    }

    let directory_offset = out.len() as u32;
    let directory_size = central.len() as u32;
    out.extend_from_slice(&central);

    // End of central directory.
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // directory disk
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&directory_size.to_le_bytes());
    out.extend_from_slice(&directory_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment len
    out
}

/// Fabricates a minimal single-sheet workbook. `rows` become `<row>`
/// elements with inline cell values; `shared` fills the shared-strings table
/// and cells reference it with `t="s"` when `(index)` markers appear as
/// `cell` values of the form `s:<index>`. A `b:<0|1>` cell becomes a boolean.
pub fn xlsx_bytes(sheet_rows: &[Vec<&str>], shared: &[&str]) -> Vec<u8> {
    let rels = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    let workbook = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    let mut shared_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst>"#,
    );
    for item in shared {
        shared_xml.push_str(&format!("<si><t>{item}</t></si>"));
    }
    shared_xml.push_str("</sst>");

    let sheet = sheet_xml(sheet_rows);

    zip_stored(&[
        ("xl/_rels/workbook.xml.rels", rels.as_slice()),
        ("xl/workbook.xml", workbook.as_slice()),
        ("xl/sharedStrings.xml", shared_xml.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
    ])
}

/// Renders rows of cell markers into sheet XML. A marker of `s:<n>` emits a
/// shared-string reference, `b:<v>` a boolean cell, `-` skips the cell
/// (sparse), anything else an inline value.
pub fn sheet_xml(rows: &[Vec<&str>]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        out.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            if *cell == "-" {
                continue;
            }
            let cell_ref = format!("{}{}", column_name(c), r + 1);
            if let Some(index) = cell.strip_prefix("s:") {
                out.push_str(&format!("<c r=\"{cell_ref}\" t=\"s\"><v>{index}</v></c>"));
            } else if let Some(value) = cell.strip_prefix("b:") {
                out.push_str(&format!("<c r=\"{cell_ref}\" t=\"b\"><v>{value}</v></c>"));
            } else {
                out.push_str(&format!("<c r=\"{cell_ref}\"><v>{cell}</v></c>"));
            }
        }
        out.push_str("</row>");
    }
    out.push_str("</sheetData></worksheet>");
    out
}

/// 0 → "A", 1 → "B", 26 → "AA".
pub fn column_name(mut index: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name
}
