//! The two sheets of the migration report: per-file inventory and summary.
//!
//! Aggregation happens elsewhere; these builders only lay already-computed
//! values out as rows.

use indexmap::IndexMap;

use crate::cell::CellValue;
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

pub const INVENTORY_SHEET: &str = "File Inventory";
pub const SUMMARY_SHEET: &str = "Summary";

const INVENTORY_HEADER: [&str; 7] = [
    "Path",
    "Filename",
    "Size (MB)",
    "Type",
    "Created Date",
    "Modified Date",
    "Issues Found",
];

/// One scanned file, as listed on the inventory sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub filename: String,
    /// `None` when the size could not be determined.
    pub size_mb: Option<f64>,
    pub extension: String,
    pub created: String,
    pub modified: String,
    pub issues: Vec<String>,
}

/// Totals shown on the summary sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub total_files: u64,
    pub total_size_mb: f64,
    pub files_with_issues: u64,
    /// File count per type, in display order.
    pub count_by_type: IndexMap<String, u64>,
}

/// Two decimals with a `.` separator, rounding half up on the shortest
/// decimal form of `v`: 2.675 gives "2.68" even though its binary value is
/// slightly below 2.675.
fn round2(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let mut buf = ryu::Buffer::new();
    let shortest = buf.format_finite(v.abs());
    let (mantissa, exp) = match shortest.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (shortest, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    // Decimal digits of |v|, with the point after `point` of them.
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes())
        .map(|b| b - b'0')
        .collect();
    let mut point = int_part.len() as i32 + exp;
    if point < 0 {
        digits.splice(0..0, std::iter::repeat(0).take(point.unsigned_abs() as usize));
        point = 0;
    }
    let mut point = point as usize;

    let keep = point + 2;
    if digits.len() <= keep {
        digits.resize(keep + 1, 0);
    }
    let round_up = digits[keep] >= 5;
    digits.truncate(keep);
    if round_up {
        let mut i = keep;
        loop {
            if i == 0 {
                digits.insert(0, 1);
                point += 1;
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let mut out = String::with_capacity(digits.len() + 3);
    if v < 0.0 {
        out.push('-');
    }
    if point == 0 {
        out.push('0');
    }
    for (i, d) in digits.iter().enumerate() {
        if i == point {
            out.push('.');
        }
        out.push(char::from(b'0' + d));
    }
    out
}

/// Header row plus one row per record. Issues are joined with `"; "`.
pub fn inventory_sheet(name: &str, records: &[FileRecord]) -> Worksheet {
    let mut ws = Worksheet::new(name);
    ws.append_row(INVENTORY_HEADER);
    for r in records {
        ws.append_row(vec![
            CellValue::from(&r.path),
            CellValue::from(&r.filename),
            CellValue::from(r.size_mb.filter(|s| *s >= 0.0).map(round2)),
            CellValue::from(&r.extension),
            CellValue::from(&r.created),
            CellValue::from(&r.modified),
            CellValue::from(r.issues.join("; ")),
        ]);
    }
    ws
}

/// Top-level metrics, a blank separator row, then counts by type.
pub fn summary_sheet(name: &str, summary: &Summary) -> Worksheet {
    let mut ws = Worksheet::new(name);
    ws.append_row(["Metric", "Value"]);
    ws.append_row(vec![
        CellValue::from("Total files scanned"),
        CellValue::from(summary.total_files),
    ]);
    ws.append_row(vec![
        CellValue::from("Total size (MB)"),
        CellValue::from(round2(summary.total_size_mb)),
    ]);
    ws.append_row(vec![
        CellValue::from("Files with issues"),
        CellValue::from(summary.files_with_issues),
    ]);
    ws.append_blank_row();
    ws.append_row(["Type", "Count"]);
    for (file_type, count) in &summary.count_by_type {
        ws.append_row(vec![CellValue::from(file_type), CellValue::from(*count)]);
    }
    ws
}

/// The full report workbook with its default sheet names.
pub fn migration_report(records: &[FileRecord], summary: &Summary) -> Workbook {
    let mut wb = Workbook::new();
    wb.add_sheet(inventory_sheet(INVENTORY_SHEET, records));
    wb.add_sheet(summary_sheet(SUMMARY_SHEET, summary));
    wb
}
