#![no_main]

//! Fuzz target for the package inspectors and the loader.
//!
//! Arbitrary bytes are tried both as a whole archive and as the content of
//! the parts the inspectors read, wrapped in a well formed archive.

use std::io::{Cursor, Write};

use libfuzzer_sys::fuzz_target;
use migscan_core::{
    inspect_docx_bytes, inspect_xlsx_bytes, inspect_xlsx_encrypted_bytes,
    inspect_xlsx_sheet_count_bytes, Workbook,
};

fn wrap(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, data) in parts {
        if zip.start_file(*name, options).is_err() || zip.write_all(data).is_err() {
            return Vec::new();
        }
    }
    zip.finish().map(Cursor::into_inner).unwrap_or_default()
}

fn inspect_all(package: &[u8]) {
    let docx = inspect_docx_bytes(package);
    let combined = inspect_xlsx_bytes(package);
    let encrypted = inspect_xlsx_encrypted_bytes(package);
    let sheets = inspect_xlsx_sheet_count_bytes(package);

    // The combined pass agrees with the two separate scans.
    if let (Ok(c), Ok(e), Ok(s)) = (&combined, &encrypted, &sheets) {
        assert_eq!(c.encrypted, *e);
        assert_eq!(c.sheet_count, *s);
    }
    if let (Ok(d), Ok(e)) = (&docx, &encrypted) {
        assert_eq!(d.encrypted, *e);
    }

    let _ = Workbook::load_from_bytes(package);
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    inspect_all(data);

    if data.len() < 4096 {
        inspect_all(&wrap(&[
            ("docProps/core.xml", data),
            ("docProps/app.xml", data),
            ("xl/workbook.xml", data),
        ]));
        inspect_all(&wrap(&[
            ("xl/workbook.xml", data),
            ("xl/worksheets/sheet1.xml", data),
            ("xl/sharedStrings.xml", data),
        ]));
    }
});
