//! Metadata inspection of existing DOCX and XLSX packages.
//!
//! Scanning is driven by part names, compared case-insensitively, and
//! tolerates missing or malformed parts. Only a container that cannot be
//! opened at all is reported as an error.

use std::path::Path;

use crate::archive::ArchiveScanner;
use crate::error::Result;
use crate::xml::{self, TagMatch, DUBLIN_CORE_NS};

/// Parts whose presence marks an encrypted (password-protected) package.
pub const ENCRYPTION_PARTS: [&str; 2] = ["EncryptedPackage", "EncryptionInfo"];

const CORE_PROPS: &str = "docProps/core.xml";
const APP_PROPS: &str = "docProps/app.xml";
const WORKBOOK: &str = "xl/workbook.xml";

/// Metadata found in a DOCX package. Every field is independently optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocxInspection {
    /// `dc:creator` from `docProps/core.xml`; blank values count as absent.
    pub author: Option<String>,
    /// `Pages` from `docProps/app.xml`.
    pub pages: Option<u32>,
    pub encrypted: bool,
}

/// Metadata found in an XLSX package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XlsxInspection {
    /// Number of `<sheet>` elements in `xl/workbook.xml`; 0 when undetermined.
    pub sheet_count: u32,
    pub encrypted: bool,
}

/// Inspect a DOCX file on disk.
pub fn inspect_docx(path: impl AsRef<Path>) -> Result<DocxInspection> {
    let data = std::fs::read(path.as_ref())?;
    inspect_docx_bytes(&data)
}

/// Inspect an in-memory DOCX package in a single pass over its entries.
///
/// Finding an encryption part does not stop the scan, and later entries
/// never clear fields that were already found.
pub fn inspect_docx_bytes(data: &[u8]) -> Result<DocxInspection> {
    let mut scanner = ArchiveScanner::from_bytes(data)?;
    let mut info = DocxInspection::default();

    while let Some(entry) = scanner.next_entry() {
        let entry = entry?;
        if entry.is_any_of(&ENCRYPTION_PARTS) {
            info.encrypted = true;
        } else if entry.is_named(CORE_PROPS) {
            if let Some(author) = parse_author(&entry.read_to_vec()?) {
                info.author = Some(author);
            }
        } else if entry.is_named(APP_PROPS) {
            if let Some(pages) = parse_pages(&entry.read_to_vec()?) {
                info.pages = Some(pages);
            }
        }
    }

    log::debug!(
        "docx: author={:?} pages={:?} encrypted={}",
        info.author,
        info.pages,
        info.encrypted
    );
    Ok(info)
}

pub fn inspect_xlsx_encrypted(path: impl AsRef<Path>) -> Result<bool> {
    let data = std::fs::read(path.as_ref())?;
    inspect_xlsx_encrypted_bytes(&data)
}

/// True as soon as an encryption part is seen; nothing else is read.
pub fn inspect_xlsx_encrypted_bytes(data: &[u8]) -> Result<bool> {
    let mut scanner = ArchiveScanner::from_bytes(data)?;
    while let Some(entry) = scanner.next_entry() {
        if entry?.is_any_of(&ENCRYPTION_PARTS) {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn inspect_xlsx_sheet_count(path: impl AsRef<Path>) -> Result<u32> {
    let data = std::fs::read(path.as_ref())?;
    inspect_xlsx_sheet_count_bytes(&data)
}

/// Sheet count from the first `xl/workbook.xml` entry, or 0 when that part
/// is missing or unparsable.
pub fn inspect_xlsx_sheet_count_bytes(data: &[u8]) -> Result<u32> {
    let mut scanner = ArchiveScanner::from_bytes(data)?;
    while let Some(entry) = scanner.next_entry() {
        let entry = entry?;
        if entry.is_named(WORKBOOK) {
            return Ok(parse_sheet_count(&entry.read_to_vec()?));
        }
    }
    log::debug!("xlsx: no {} part", WORKBOOK);
    Ok(0)
}

pub fn inspect_xlsx(path: impl AsRef<Path>) -> Result<XlsxInspection> {
    let data = std::fs::read(path.as_ref())?;
    inspect_xlsx_bytes(&data)
}

/// Both XLSX fields from one pass over the entries.
pub fn inspect_xlsx_bytes(data: &[u8]) -> Result<XlsxInspection> {
    let mut scanner = ArchiveScanner::from_bytes(data)?;
    let mut info = XlsxInspection::default();
    let mut workbook_seen = false;

    while let Some(entry) = scanner.next_entry() {
        let entry = entry?;
        if entry.is_any_of(&ENCRYPTION_PARTS) {
            info.encrypted = true;
        } else if !workbook_seen && entry.is_named(WORKBOOK) {
            workbook_seen = true;
            info.sheet_count = parse_sheet_count(&entry.read_to_vec()?);
        }
    }

    log::debug!(
        "xlsx: sheet_count={} encrypted={}",
        info.sheet_count,
        info.encrypted
    );
    Ok(info)
}

fn parse_author(xml: &[u8]) -> Option<String> {
    let author = xml::first_element_text(
        xml,
        &[
            TagMatch::Namespaced {
                namespace: DUBLIN_CORE_NS,
                local: "creator",
            },
            TagMatch::Qualified("dc:creator"),
        ],
    );
    author.filter(|a| !a.trim().is_empty())
}

fn parse_pages(xml: &[u8]) -> Option<u32> {
    xml::element_u32(xml, TagMatch::Local("Pages"))
}

fn parse_sheet_count(xml: &[u8]) -> u32 {
    match xml::count_elements(xml, TagMatch::Local("sheet")) {
        Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        None => {
            log::debug!("xlsx: {} could not be parsed; sheet count defaults to 0", WORKBOOK);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::zip_of;
    use crate::error::CodecError;

    const CORE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>Ada Lovelace</dc:creator></cp:coreProperties>"#;

    const APP: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Pages>7</Pages></Properties>"#;

    const WORKBOOK_XML: &[u8] = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="A" sheetId="1" r:id="rId1"/><sheet name="B" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    #[test]
    fn test_docx_metadata() {
        let data = zip_of(&[
            ("word/document.xml", b"<w:document/>"),
            ("docProps/core.xml", CORE),
            ("docProps/app.xml", APP),
        ]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert_eq!(
            info,
            DocxInspection {
                author: Some("Ada Lovelace".to_string()),
                pages: Some(7),
                encrypted: false,
            }
        );
    }

    #[test]
    fn test_docx_part_names_case_insensitive() {
        let data = zip_of(&[("DOCPROPS/CORE.XML", CORE), ("docprops/App.xml", APP)]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert_eq!(info.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(info.pages, Some(7));
    }

    #[test]
    fn test_docx_encrypted_without_core() {
        let data = zip_of(&[("EncryptedPackage", b"\x00\x01\x02")]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert_eq!(
            info,
            DocxInspection {
                author: None,
                pages: None,
                encrypted: true,
            }
        );
    }

    #[test]
    fn test_docx_encryption_does_not_clear_found_fields() {
        let data = zip_of(&[
            ("docProps/core.xml", CORE),
            ("encryptioninfo", b"\x04\x00"),
            ("docProps/app.xml", APP),
        ]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert!(info.encrypted);
        assert_eq!(info.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(info.pages, Some(7));
    }

    #[test]
    fn test_docx_duplicate_parts_keep_found_fields() {
        let blank_core: &[u8] = br#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>   </dc:creator></cp:coreProperties>"#;
        let bad_app: &[u8] = b"<Properties><Pages>many</Pages></Properties>";
        // Names differ only in case, so the archive holds two entries that
        // both resolve to the same part.
        let data = zip_of(&[
            ("docProps/core.xml", CORE),
            ("docProps/app.xml", APP),
            ("DOCPROPS/CORE.XML", blank_core),
            ("DOCPROPS/APP.XML", bad_app),
        ]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert_eq!(info.author.as_deref(), Some("Ada Lovelace"));
        assert_eq!(info.pages, Some(7));

        let data = zip_of(&[("docProps/core.xml", blank_core), ("DOCPROPS/CORE.XML", CORE)]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert_eq!(info.author.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn test_docx_blank_author_and_bad_pages() {
        let core = br#"<cp:coreProperties xmlns:cp="urn:cp" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>   </dc:creator></cp:coreProperties>"#;
        let app = br#"<Properties><Pages>many</Pages></Properties>"#;
        let data = zip_of(&[("docProps/core.xml", core), ("docProps/app.xml", app)]);
        let info = inspect_docx_bytes(&data).unwrap();
        assert_eq!(info, DocxInspection::default());
    }

    #[test]
    fn test_docx_author_fallback_and_malformed_core() {
        let core = br#"<coreProperties><dc:creator>Undeclared</dc:creator></coreProperties>"#;
        let data = zip_of(&[("docProps/core.xml", core)]);
        assert_eq!(
            inspect_docx_bytes(&data).unwrap().author.as_deref(),
            Some("Undeclared")
        );

        let data = zip_of(&[("docProps/core.xml", b"<cp:coreProperties><dc:creator>")]);
        assert_eq!(inspect_docx_bytes(&data).unwrap().author, None);
    }

    #[test]
    fn test_xlsx_sheet_count() {
        let data = zip_of(&[("xl/workbook.xml", WORKBOOK_XML)]);
        assert_eq!(inspect_xlsx_sheet_count_bytes(&data).unwrap(), 2);
        assert!(!inspect_xlsx_encrypted_bytes(&data).unwrap());
    }

    #[test]
    fn test_xlsx_malformed_workbook_counts_zero() {
        let data = zip_of(&[("xl/workbook.xml", b"<workbook><sheets><sheet name=\"A\"/>")]);
        assert_eq!(inspect_xlsx_sheet_count_bytes(&data).unwrap(), 0);
        assert_eq!(inspect_xlsx_bytes(&data).unwrap().sheet_count, 0);
    }

    #[test]
    fn test_xlsx_missing_workbook_counts_zero() {
        let data = zip_of(&[("EncryptionInfo", b"\x04\x00"), ("EncryptedPackage", b"\x00")]);
        assert_eq!(inspect_xlsx_sheet_count_bytes(&data).unwrap(), 0);
        assert!(inspect_xlsx_encrypted_bytes(&data).unwrap());
        assert_eq!(
            inspect_xlsx_bytes(&data).unwrap(),
            XlsxInspection {
                sheet_count: 0,
                encrypted: true,
            }
        );
    }

    #[test]
    fn test_xlsx_combined_pass() {
        let data = zip_of(&[("XL/Workbook.xml", WORKBOOK_XML), ("EncryptionInfo", b"")]);
        assert_eq!(
            inspect_xlsx_bytes(&data).unwrap(),
            XlsxInspection {
                sheet_count: 2,
                encrypted: true,
            }
        );
    }

    #[test]
    fn test_non_zip_input_propagates() {
        let garbage = b"%PDF-1.7 definitely not a zip container";
        assert!(matches!(
            inspect_docx_bytes(garbage),
            Err(CodecError::MalformedArchive(_))
        ));
        assert!(matches!(
            inspect_xlsx_bytes(garbage),
            Err(CodecError::MalformedArchive(_))
        ));
        assert!(matches!(
            inspect_xlsx_sheet_count_bytes(garbage),
            Err(CodecError::MalformedArchive(_))
        ));
        assert!(matches!(
            inspect_xlsx_encrypted_bytes(garbage),
            Err(CodecError::MalformedArchive(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = inspect_docx("/definitely/not/here.docx");
        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
