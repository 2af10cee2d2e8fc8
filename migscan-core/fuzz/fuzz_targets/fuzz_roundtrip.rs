#![no_main]

//! Write arbitrary grids, then read them back with the loader and the
//! inspector. Everything the writer produces must load to the same cells.

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use migscan_core::{inspect_xlsx_bytes, CellValue, CompressionLevel, Workbook, WriteOptions};

const MAX_ROWS: usize = 30;
const MAX_COLS: usize = 12;
const MAX_SHEETS: usize = 4;

#[derive(Debug, Clone)]
struct FuzzCell(CellValue);

impl<'a> Arbitrary<'a> for FuzzCell {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(FuzzCell(match u.int_in_range(0..=2u8)? {
            0 => CellValue::Empty,
            1 => CellValue::Number(u.arbitrary()?),
            _ => {
                // Any Unicode except the control characters XML 1.0 forbids.
                let s: String = u.arbitrary()?;
                CellValue::from(
                    s.chars()
                        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n'))
                        .collect::<String>(),
                )
            }
        }))
    }
}

#[derive(Debug)]
struct FuzzWorkbook {
    compression: u8,
    sheets: Vec<(String, Vec<Vec<FuzzCell>>)>,
}

impl<'a> Arbitrary<'a> for FuzzWorkbook {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let compression = u.arbitrary()?;
        let sheet_count = u.int_in_range(0..=MAX_SHEETS)?;
        let mut sheets = Vec::with_capacity(sheet_count);
        for i in 0..sheet_count {
            let name: String = u.arbitrary()?;
            let name = if name.chars().any(char::is_control) || name.is_empty() {
                format!("Sheet{}", i + 1)
            } else {
                name
            };
            let row_count = u.int_in_range(0..=MAX_ROWS)?;
            let mut rows = Vec::with_capacity(row_count);
            for _ in 0..row_count {
                let width = u.int_in_range(0..=MAX_COLS)?;
                let mut row = Vec::with_capacity(width);
                for _ in 0..width {
                    row.push(u.arbitrary()?);
                }
                rows.push(row);
            }
            sheets.push((name, rows));
        }
        Ok(FuzzWorkbook { compression, sheets })
    }
}

/// What the loader is expected to return for a written cell.
fn expected(value: &CellValue) -> CellValue {
    match value {
        CellValue::Number(n) if n.is_nan() => CellValue::from("NaN"),
        CellValue::Number(n) if n.is_infinite() && *n > 0.0 => CellValue::from("Infinity"),
        CellValue::Number(n) if n.is_infinite() => CellValue::from("-Infinity"),
        other => other.clone(),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(fuzz_wb) = FuzzWorkbook::arbitrary(&mut u) else {
        return;
    };

    let compression = match fuzz_wb.compression % 4 {
        0 => CompressionLevel::None,
        1 => CompressionLevel::Fast,
        2 => CompressionLevel::Default,
        _ => CompressionLevel::Best,
    };
    let mut wb = Workbook::with_options(WriteOptions::new().compression(compression));
    for (name, rows) in &fuzz_wb.sheets {
        let ws = wb.create_sheet(name.clone());
        for row in rows {
            ws.append_row(row.iter().map(|c| c.0.clone()));
        }
    }

    let bytes = match wb.save_to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => panic!("failed to write workbook: {:?}", e),
    };

    let inspection = inspect_xlsx_bytes(&bytes).expect("inspect own output");
    assert_eq!(inspection.sheet_count as usize, fuzz_wb.sheets.len());
    assert!(!inspection.encrypted);

    let loaded = match Workbook::load_from_bytes(&bytes) {
        Ok(wb) => wb,
        Err(e) => panic!("failed to load workbook that we just saved: {:?}", e),
    };
    assert_eq!(loaded.worksheets().len(), fuzz_wb.sheets.len());

    for (ws, (name, rows)) in loaded.worksheets().iter().zip(&fuzz_wb.sheets) {
        assert_eq!(ws.title(), name);
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let got = ws
                    .get_cell_value(r as u32 + 1, c as u32 + 1)
                    .cloned()
                    .unwrap_or_default();
                assert_eq!(got, expected(&cell.0), "sheet {:?} cell ({}, {})", name, r + 1, c + 1);
            }
        }
    }
});
