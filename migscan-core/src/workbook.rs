//! Workbook representation and file I/O operations.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::archive::ArchiveScanner;
use crate::cell::CellValue;
use crate::error::{CodecError, Result};
use crate::options::{CompressionLevel, WriteOptions};
use crate::utils::{parse_coordinate_bytes, MAX_COLUMN, MAX_ROW};
use crate::worksheet::Worksheet;
use crate::writer::{self, Part, WORKBOOK_PART, WORKBOOK_RELS_PART};

/// An ordered set of worksheets plus the options used to write them.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    options: WriteOptions,
}

impl Workbook {
    /// Create a new empty workbook with default write options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriteOptions) -> Self {
        Workbook {
            worksheets: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: WriteOptions) {
        self.options = options;
    }

    /// Set compression level for saving.
    pub fn set_compression(&mut self, level: CompressionLevel) {
        self.options.compression = level;
    }

    /// Append an empty sheet and return it for filling.
    ///
    /// Names are not checked for uniqueness or length; they are only escaped
    /// when written.
    pub fn create_sheet(&mut self, name: impl Into<String>) -> &mut Worksheet {
        self.worksheets.push(Worksheet::new(name));
        let last = self.worksheets.len() - 1;
        &mut self.worksheets[last]
    }

    pub fn add_sheet(&mut self, worksheet: Worksheet) {
        self.worksheets.push(worksheet);
    }

    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::title).collect()
    }

    pub fn get_sheet_by_name(&self, name: &str) -> Result<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.title() == name)
            .ok_or_else(|| CodecError::SheetNotFound(name.to_string()))
    }

    pub fn get_sheet_by_index(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Render every part of the package, stamping document properties with `now`.
    pub fn to_parts(&self, now: DateTime<Utc>) -> Vec<Part> {
        writer::build_parts(&self.worksheets, &self.options.properties, now)
    }

    /// Save the workbook to a file.
    ///
    /// The package is rendered in memory first; the destination is only
    /// created once every part has been produced.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes)?;
        log::debug!(
            "wrote {} sheet(s) to {}",
            self.worksheets.len(),
            path.display()
        );
        Ok(())
    }

    /// Save the workbook to an in-memory byte vector.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>> {
        self.save_to_bytes_at(Utc::now())
    }

    /// Like [`Workbook::save_to_bytes`] with a fixed write timestamp.
    pub fn save_to_bytes_at(&self, now: DateTime<Utc>) -> Result<Vec<u8>> {
        let cursor = writer::pack(
            &self.to_parts(now),
            Cursor::new(Vec::new()),
            &self.options.file_options(),
        )?;
        Ok(cursor.into_inner())
    }

    /// Save the workbook to any writer that implements Write + Seek.
    pub fn save_to_writer<W: Write + Seek>(&self, writer: W) -> Result<()> {
        writer::pack(
            &self.to_parts(Utc::now()),
            writer,
            &self.options.file_options(),
        )?;
        Ok(())
    }

    /// Load a workbook from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::load_from_bytes(&data)
    }

    /// Load a workbook from bytes.
    ///
    /// Reads sheet names from `xl/workbook.xml`, follows each sheet's
    /// relationship to its worksheet part, and reads numeric, inline-string
    /// and shared-string cells. Styles and formulas are ignored.
    pub fn load_from_bytes(data: &[u8]) -> Result<Self> {
        let parts = read_all_parts(data)?;
        let part = |name: &str| parts.get(name.to_ascii_lowercase().as_str());

        let workbook_xml = part(WORKBOOK_PART).ok_or_else(|| {
            CodecError::InvalidFormat(format!("Failed to find {} in archive", WORKBOOK_PART))
        })?;
        let sheet_info = parse_workbook_xml(workbook_xml)?;

        let rels_map = match part(WORKBOOK_RELS_PART) {
            Some(xml) => parse_workbook_rels(xml)?,
            None => HashMap::new(),
        };
        let shared_strings = match part("xl/sharedStrings.xml") {
            Some(xml) => parse_shared_strings_xml(xml)?,
            None => Vec::new(),
        };

        let mut workbook = Workbook::new();
        for (sheet_name, sheet_id, sheet_rid) in sheet_info {
            let sheet_path = match rels_map.get(&sheet_rid) {
                Some(target) => match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                },
                None => writer::worksheet_part_name(sheet_id as usize),
            };
            let sheet_xml = part(&sheet_path).ok_or_else(|| {
                CodecError::InvalidFormat(format!(
                    "Failed to find {} for sheet '{}'",
                    sheet_path, sheet_name
                ))
            })?;
            let rows = parse_worksheet_xml(sheet_xml, &shared_strings)?;
            workbook.add_sheet(Worksheet::with_rows(sheet_name, rows));
        }

        Ok(workbook)
    }
}

/// Write the given sheets, in map order, as an XLSX package at `destination`.
pub fn write_workbook(
    sheets: IndexMap<String, Vec<Vec<CellValue>>>,
    destination: impl AsRef<Path>,
) -> Result<()> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        workbook.add_sheet(Worksheet::with_rows(name, rows));
    }
    workbook.save(destination)
}

/// Every entry of the archive, keyed by lower-cased part name.
fn read_all_parts(data: &[u8]) -> Result<HashMap<String, Vec<u8>>> {
    let mut scanner = ArchiveScanner::from_bytes(data)?;
    let mut parts = HashMap::with_capacity(scanner.len());
    while let Some(entry) = scanner.next_entry() {
        let entry = entry?;
        let name = entry.name().to_ascii_lowercase();
        parts.insert(name, entry.read_to_vec()?);
    }
    Ok(parts)
}

fn xml_error(part: &str, e: quick_xml::Error) -> CodecError {
    CodecError::ParseError(format!("XML parsing error in {}: {}", part, e))
}

/// Get a string attribute value by local name (so `r:id` matches `id`).
fn get_attr_str(e: &BytesStart, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parses workbook.xml and returns (name, sheetId, rId) per sheet, in order.
fn parse_workbook_xml(xml: &[u8]) -> Result<Vec<(String, u32, String)>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = get_attr_str(&e, b"name");
                let id = get_attr_str(&e, b"sheetId").and_then(|s| s.parse().ok());
                let rid = get_attr_str(&e, b"id");
                match (name, id, rid) {
                    (Some(name), Some(id), Some(rid)) => sheets.push((name, id, rid)),
                    _ => log::warn!("skipping incomplete <sheet> element in workbook.xml"),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Parses workbook.xml.rels and returns a mapping of relationship IDs to target paths.
fn parse_workbook_rels(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rels = HashMap::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (get_attr_str(&e, b"Id"), get_attr_str(&e, b"Target"))
                {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(WORKBOOK_RELS_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

fn parse_shared_strings_xml(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    // Whitespace inside <t> is significant.
    reader.config_mut().trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_t = true,
            Ok(Event::Text(e)) if in_t => {
                let text = e
                    .unescape()
                    .map_err(|err| xml_error("xl/sharedStrings.xml", err))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/sharedStrings.xml", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// A `<c>` element being read.
#[derive(Default)]
struct PendingCell {
    position: Option<(u32, u32)>,
    cell_type: Option<String>,
    value: String,
}

fn resolve_cell(cell: &PendingCell, shared_strings: &[String]) -> CellValue {
    match cell.cell_type.as_deref() {
        Some("s") => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .map_or(CellValue::Empty, |s| CellValue::text(s.as_str())),
        Some("inlineStr") | Some("str") | Some("e") => CellValue::text(cell.value.as_str()),
        _ if cell.value.is_empty() => CellValue::Empty,
        _ => match cell.value.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::text(cell.value.as_str()),
        },
    }
}

/// Row number of a `<row>` element: its `r` attribute, or the row after
/// `previous` when it has none.
fn row_number(e: &BytesStart, previous: u32) -> Result<u32> {
    let row = match get_attr_str(e, b"r") {
        Some(r) => r.trim().parse::<u32>().ok(),
        None => previous.checked_add(1),
    };
    row.filter(|r| (1..=MAX_ROW).contains(r)).ok_or_else(|| {
        CodecError::InvalidCoordinate(format!("row number out of range after row {}", previous))
    })
}

/// Position of a `<c>` element without an `r` attribute: next column in the
/// current row.
fn next_cell(row: u32, column: u32) -> Result<(u32, u32)> {
    match column.checked_add(1) {
        Some(next) if next <= MAX_COLUMN => Ok((row.max(1), next)),
        _ => Err(CodecError::InvalidCoordinate(format!(
            "too many cells in row {}",
            row
        ))),
    }
}

fn place(rows: &mut Vec<Vec<CellValue>>, row: u32, column: u32, value: CellValue) {
    let (r, c) = ((row - 1) as usize, (column - 1) as usize);
    if rows.len() <= r {
        rows.resize_with(r + 1, Vec::new);
    }
    let cells = &mut rows[r];
    if cells.len() <= c {
        cells.resize(c + 1, CellValue::Empty);
    }
    cells[c] = value;
}

/// Parse a worksheet part into rows of cells.
///
/// Cells are placed by their `r` attribute; rows and cells without one
/// follow their predecessor.
fn parse_worksheet_xml(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut buf = Vec::new();
    let mut row_num: u32 = 0;
    let mut col_num: u32 = 0;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row_num = row_number(&e, row_num)?;
                    col_num = 0;
                    if rows.len() < row_num as usize {
                        rows.resize_with(row_num as usize, Vec::new);
                    }
                }
                b"c" => {
                    cell = Some(PendingCell {
                        position: get_attr_str(&e, b"r")
                            .and_then(|r| parse_coordinate_bytes(r.as_bytes())),
                        cell_type: get_attr_str(&e, b"t"),
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row_num = row_number(&e, row_num)?;
                    col_num = 0;
                    if rows.len() < row_num as usize {
                        rows.resize_with(row_num as usize, Vec::new);
                    }
                }
                b"c" => {
                    let (row, column) = match get_attr_str(&e, b"r")
                        .and_then(|r| parse_coordinate_bytes(r.as_bytes()))
                    {
                        Some(position) => position,
                        None => next_cell(row_num, col_num)?,
                    };
                    col_num = column;
                    place(&mut rows, row, column, CellValue::Empty);
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_value => {
                let text = e.unescape().map_err(|err| xml_error("worksheet", err))?;
                if let Some(pending) = cell.as_mut() {
                    pending.value.push_str(&text);
                }
            }
            Ok(Event::CData(e)) if in_value => {
                if let Some(pending) = cell.as_mut() {
                    pending.value.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        let (row, column) = match pending.position {
                            Some(position) => position,
                            None => next_cell(row_num, col_num)?,
                        };
                        col_num = column;
                        place(&mut rows, row, column, resolve_cell(&pending, shared_strings));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("worksheet", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}
