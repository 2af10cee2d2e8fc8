//! OOXML package codec for the migration scanner.
//!
//! The read side opens DOCX and XLSX packages (ZIP archives of XML parts)
//! and pulls out the few facts a migration assessment needs: document
//! author, page count, sheet count and whether the package is encrypted.
//! The write side emits a minimal XLSX workbook from rows of cells.
//!
//! ```no_run
//! use migscan_core::{inspect_docx, Workbook};
//!
//! let docx = inspect_docx("report.docx")?;
//! println!("author={:?} pages={:?}", docx.author, docx.pages);
//!
//! let mut wb = Workbook::new();
//! let ws = wb.create_sheet("Results");
//! ws.append_row(["Name", "Count"]);
//! ws.append_row(vec![migscan_core::CellValue::from("files"), 3.into()]);
//! wb.save("results.xlsx")?;
//! # Ok::<(), migscan_core::CodecError>(())
//! ```

pub mod archive;
pub mod cell;
pub mod error;
pub mod inspect;
pub mod options;
pub mod report;
pub mod utils;
pub mod workbook;
pub mod worksheet;
pub mod writer;
pub mod xml;

pub use archive::ArchiveScanner;
pub use cell::CellValue;
pub use error::{CodecError, Result};
pub use inspect::{
    inspect_docx, inspect_docx_bytes, inspect_xlsx, inspect_xlsx_bytes, inspect_xlsx_encrypted,
    inspect_xlsx_encrypted_bytes, inspect_xlsx_sheet_count, inspect_xlsx_sheet_count_bytes,
    DocxInspection, XlsxInspection,
};
pub use options::{CompressionLevel, DocumentProperties, WriteOptions};
pub use report::{migration_report, FileRecord, Summary};
pub use utils::{column_to_letter, coordinate_from_row_col, letter_to_column, parse_coordinate};
pub use workbook::{write_workbook, Workbook};
pub use worksheet::Worksheet;
