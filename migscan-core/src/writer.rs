//! Rendering of the SpreadsheetML part set and packing it into a ZIP stream.

use std::borrow::Cow;
use std::io::{Seek, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use zip::write::{ExtendedFileOptions, FileOptions};
use zip::ZipWriter;

use crate::cell::CellValue;
use crate::error::Result;
use crate::options::DocumentProperties;
use crate::utils::column_to_letter;
use crate::worksheet::Worksheet;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const ROOT_RELS_PART: &str = "_rels/.rels";
pub const CORE_PROPS_PART: &str = "docProps/core.xml";
pub const APP_PROPS_PART: &str = "docProps/app.xml";
pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_XML: &str = "application/xml";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_CORE_PROPS: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP_PROPS: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_APP_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_SPREADSHEET: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_OFFICE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A named part of the package and its serialized content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

impl Part {
    fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Part {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Part name of the n-th worksheet (1-based).
pub fn worksheet_part_name(index: usize) -> String {
    format!("xl/worksheets/sheet{}.xml", index)
}

/// Escape text for use inside a double-quoted attribute value.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape_with(s, |c| match c {
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    })
}

/// Escape text for use as element content. Quotes are left alone.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape_with(s, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    })
}

fn escape_with(s: &str, replace: impl Fn(char) -> Option<&'static str>) -> Cow<'_, str> {
    let Some(first) = s.find(|c: char| replace(c).is_some()) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len() + 16);
    out.push_str(&s[..first]);
    for c in s[first..].chars() {
        match replace(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Append a number in plain decimal form: integral values without a
/// fractional part, everything else in shortest round-trip form.
fn push_number(out: &mut String, n: f64) {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        out.push_str(itoa::Buffer::new().format(n as i64));
    } else {
        out.push_str(ryu::Buffer::new().format_finite(n));
    }
}

fn push_inline_string(out: &mut String, coord: &str, text: &str) {
    out.push_str("<c r=\"");
    out.push_str(coord);
    out.push_str("\" t=\"inlineStr\"><is>");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        out.push_str("<t xml:space=\"preserve\">");
    } else {
        out.push_str("<t>");
    }
    out.push_str(&escape_text(text));
    out.push_str("</t></is></c>");
}

/// Append the `<c>` element for one cell.
///
/// * empty: `<c r="A1"/>`
/// * number: `<c r="A1"><v>3.5</v></c>`
/// * text: `<c r="A1" t="inlineStr"><is><t>A&amp;B</t></is></c>`
///
/// Non-finite numbers have no `<v>` representation and are written as text.
pub fn format_cell_value(out: &mut String, coord: &str, value: &CellValue) {
    match value {
        CellValue::Number(n) if n.is_finite() => {
            out.push_str("<c r=\"");
            out.push_str(coord);
            out.push_str("\"><v>");
            push_number(out, *n);
            out.push_str("</v></c>");
        }
        CellValue::Number(n) => {
            let text = if n.is_nan() {
                "NaN"
            } else if n.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            };
            push_inline_string(out, coord, text);
        }
        CellValue::Text(s) if !s.is_empty() => push_inline_string(out, coord, s),
        _ => {
            out.push_str("<c r=\"");
            out.push_str(coord);
            out.push_str("\"/>");
        }
    }
}

pub fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(1024 + sheet_count * 160);
    xml.push_str(XML_DECLARATION);
    xml.push_str(&format!("\n<Types xmlns=\"{}\">\n", NS_CONTENT_TYPES));
    xml.push_str(&format!(
        "<Default Extension=\"rels\" ContentType=\"{}\"/>\n",
        CT_RELATIONSHIPS
    ));
    xml.push_str(&format!("<Default Extension=\"xml\" ContentType=\"{}\"/>\n", CT_XML));
    xml.push_str(&format!(
        "<Override PartName=\"/{}\" ContentType=\"{}\"/>\n",
        WORKBOOK_PART, CT_WORKBOOK
    ));
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/{}\" ContentType=\"{}\"/>\n",
            worksheet_part_name(i),
            CT_WORKSHEET
        ));
    }
    xml.push_str(&format!(
        "<Override PartName=\"/{}\" ContentType=\"{}\"/>\n",
        CORE_PROPS_PART, CT_CORE_PROPS
    ));
    xml.push_str(&format!(
        "<Override PartName=\"/{}\" ContentType=\"{}\"/>\n",
        APP_PROPS_PART, CT_APP_PROPS
    ));
    xml.push_str("</Types>");
    xml
}

pub fn root_rels_xml() -> String {
    format!(
        "{decl}\n<Relationships xmlns=\"{ns}\">\n\
<Relationship Id=\"rId1\" Type=\"{office}\" Target=\"{workbook}\"/>\n\
<Relationship Id=\"rId2\" Type=\"{core}\" Target=\"{core_part}\"/>\n\
<Relationship Id=\"rId3\" Type=\"{app}\" Target=\"{app_part}\"/>\n\
</Relationships>",
        decl = XML_DECLARATION,
        ns = NS_RELATIONSHIPS,
        office = REL_OFFICE_DOCUMENT,
        workbook = WORKBOOK_PART,
        core = REL_CORE_PROPS,
        core_part = CORE_PROPS_PART,
        app = REL_APP_PROPS,
        app_part = APP_PROPS_PART,
    )
}

/// `docProps/core.xml`; `created` and `modified` are both `now`.
pub fn core_props_xml(props: &DocumentProperties, now: DateTime<Utc>) -> String {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        "{decl}\n<cp:coreProperties \
xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
xmlns:dcterms=\"http://purl.org/dc/terms/\" \
xmlns:dcmitype=\"http://purl.org/dc/dcmitype/\" \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
<dc:title>{title}</dc:title>\n\
<dc:creator>{creator}</dc:creator>\n\
<cp:lastModifiedBy>{creator}</cp:lastModifiedBy>\n\
<dcterms:created xsi:type=\"dcterms:W3CDTF\">{ts}</dcterms:created>\n\
<dcterms:modified xsi:type=\"dcterms:W3CDTF\">{ts}</dcterms:modified>\n\
</cp:coreProperties>",
        decl = XML_DECLARATION,
        title = escape_text(&props.title),
        creator = escape_text(&props.creator),
        ts = timestamp,
    )
}

/// `docProps/app.xml`. `DocSecurity` is always 0: the writer never encrypts.
pub fn app_props_xml(props: &DocumentProperties) -> String {
    format!(
        "{decl}\n<Properties \
xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\" \
xmlns:vt=\"http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes\">\n\
<Application>{app}</Application>\n\
<DocSecurity>0</DocSecurity>\n\
<AppVersion>{version}</AppVersion>\n\
</Properties>",
        decl = XML_DECLARATION,
        app = escape_text(&props.application),
        version = escape_text(&props.app_version),
    )
}

/// `xl/workbook.xml`: sheet n gets `sheetId="n"` and `r:id="rIdn"`.
pub fn workbook_xml<'a>(sheet_names: impl IntoIterator<Item = &'a str>) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECLARATION);
    xml.push_str(&format!(
        "\n<workbook xmlns=\"{}\" xmlns:r=\"{}\">\n<sheets>\n",
        NS_SPREADSHEET, NS_OFFICE_RELATIONSHIPS
    ));
    for (i, name) in sheet_names.into_iter().enumerate() {
        let n = i + 1;
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>\n",
            escape_attr(name),
            n,
            n
        ));
    }
    xml.push_str("</sheets>\n</workbook>");
    xml
}

/// `xl/_rels/workbook.xml.rels`: `rIdn` targets `worksheets/sheetn.xml`.
pub fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(256 + sheet_count * 160);
    xml.push_str(XML_DECLARATION);
    xml.push_str(&format!("\n<Relationships xmlns=\"{}\">\n", NS_RELATIONSHIPS));
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"{}\" Target=\"worksheets/sheet{}.xml\"/>\n",
            n, REL_WORKSHEET, n
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Worksheet XML: `<dimension>` followed by one `<row>` per row.
pub fn worksheet_xml(worksheet: &Worksheet) -> String {
    let cell_estimate: usize = worksheet.rows().iter().map(Vec::len).sum();
    let mut xml = String::with_capacity(256 + worksheet.row_count() * 24 + cell_estimate * 32);
    xml.push_str(XML_DECLARATION);
    xml.push_str(&format!("\n<worksheet xmlns=\"{}\">", NS_SPREADSHEET));
    xml.push_str(&format!("<dimension ref=\"{}\"/>", worksheet.dimension()));

    // Column letters are shared by every row, so compute them once.
    let columns: Vec<String> = (1..=worksheet.max_columns() as u32)
        .map(column_to_letter)
        .collect();

    xml.push_str("<sheetData>");
    let mut row_buf = itoa::Buffer::new();
    let mut coord = String::with_capacity(12);
    for (r, row) in worksheet.rows().iter().enumerate() {
        let row_num = row_buf.format(r + 1).to_owned();
        if row.is_empty() {
            xml.push_str(&format!("<row r=\"{}\"/>", row_num));
            continue;
        }
        xml.push_str(&format!("<row r=\"{}\">", row_num));
        for (c, value) in row.iter().enumerate() {
            coord.clear();
            coord.push_str(&columns[c]);
            coord.push_str(&row_num);
            format_cell_value(&mut xml, &coord, value);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Render the full part list, in package order.
///
/// Worksheets are rendered in parallel when there is more than one; their
/// position in the package is unaffected.
pub fn build_parts(
    worksheets: &[Worksheet],
    props: &DocumentProperties,
    now: DateTime<Utc>,
) -> Vec<Part> {
    let sheet_count = worksheets.len();
    let mut parts = Vec::with_capacity(6 + sheet_count);

    parts.push(Part::new(CONTENT_TYPES_PART, content_types_xml(sheet_count)));
    parts.push(Part::new(ROOT_RELS_PART, root_rels_xml()));
    parts.push(Part::new(CORE_PROPS_PART, core_props_xml(props, now)));
    parts.push(Part::new(APP_PROPS_PART, app_props_xml(props)));
    parts.push(Part::new(
        WORKBOOK_PART,
        workbook_xml(worksheets.iter().map(Worksheet::title)),
    ));
    parts.push(Part::new(WORKBOOK_RELS_PART, workbook_rels_xml(sheet_count)));

    let rendered: Vec<String> = if sheet_count > 1 {
        worksheets.par_iter().map(worksheet_xml).collect()
    } else {
        worksheets.iter().map(worksheet_xml).collect()
    };
    for (i, xml) in rendered.into_iter().enumerate() {
        parts.push(Part::new(worksheet_part_name(i + 1), xml));
    }

    parts
}

/// Write each part as one archive entry, in order, and finish the archive.
pub fn pack<W: Write + Seek>(
    parts: &[Part],
    writer: W,
    options: &FileOptions<'static, ExtendedFileOptions>,
) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    for part in parts {
        log::debug!("writing part {} ({} bytes)", part.name, part.data.len());
        zip.start_file(part.name.as_str(), options.clone())?;
        zip.write_all(&part.data)?;
    }
    Ok(zip.finish()?)
}
