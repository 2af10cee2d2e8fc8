use std::io::{Cursor, Read};

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use indexmap::IndexMap;
use migscan_core::{
    inspect_xlsx_bytes, migration_report, write_workbook, CellValue, CompressionLevel, FileRecord,
    Summary, Workbook, WriteOptions,
};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn sample_workbook(sheets: usize) -> Workbook {
    let mut wb = Workbook::new();
    for i in 1..=sheets {
        let ws = wb.create_sheet(format!("Sheet {}", i));
        ws.append_row(["Name", "Count"]);
        ws.append_row(vec![CellValue::from("R&D <lab>"), CellValue::from(i)]);
    }
    wb
}

fn entry_text(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

#[test]
fn test_calamine_reads_written_cells() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet("Data");
    ws.append_row(["Metric", "Value"]);
    ws.append_row(vec![CellValue::from("pi"), CellValue::from(3.25)]);
    ws.append_blank_row();
    ws.append_row(vec![CellValue::Empty, CellValue::from("a & b")]);
    let bytes = wb.save_to_bytes().unwrap();

    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    assert_eq!(xlsx.sheet_names(), vec!["Data".to_string()]);

    let range = xlsx.worksheet_range("Data").unwrap();
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("Metric".into())));
    assert_eq!(range.get_value((1, 1)), Some(&Data::Float(3.25)));
    assert_eq!(range.get_value((3, 1)), Some(&Data::String("a & b".into())));
}

#[test]
fn test_calamine_reads_every_sheet_in_order() {
    let bytes = sample_workbook(3).save_to_bytes().unwrap();
    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();

    assert_eq!(
        xlsx.sheet_names(),
        vec!["Sheet 1".to_string(), "Sheet 2".to_string(), "Sheet 3".to_string()]
    );
    let range = xlsx.worksheet_range("Sheet 3").unwrap();
    assert_eq!(range.get_value((1, 0)), Some(&Data::String("R&D <lab>".into())));
    assert_eq!(range.get_value((1, 1)), Some(&Data::Float(3.0)));
}

#[test]
fn test_relationships_are_consistent() {
    for sheets in [1usize, 2, 5] {
        let bytes = sample_workbook(sheets).save_to_bytes().unwrap();
        let workbook = entry_text(&bytes, "xl/workbook.xml");
        let rels = entry_text(&bytes, "xl/_rels/workbook.xml.rels");
        let types = entry_text(&bytes, "[Content_Types].xml");

        for n in 1..=sheets {
            assert!(workbook.contains(&format!("sheetId=\"{}\" r:id=\"rId{}\"", n, n)));
            assert!(rels.contains(&format!(
                "Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"",
                n, n
            )));
            assert!(types.contains(&format!("PartName=\"/xl/worksheets/sheet{}.xml\"", n)));
            entry_text(&bytes, &format!("xl/worksheets/sheet{}.xml", n));
        }
        assert_eq!(workbook.matches("<sheet ").count(), sheets);
        assert_eq!(rels.matches("<Relationship ").count(), sheets);
    }
}

#[test]
fn test_part_order() {
    let bytes = sample_workbook(2).save_to_bytes().unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut sorted: Vec<&str> = archive.file_names().collect();
    sorted.sort_unstable();
    assert_eq!(
        sorted,
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/app.xml",
            "docProps/core.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/workbook.xml",
            "xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet2.xml",
        ]
    );

    let first = archive.by_index(0).unwrap().name().to_string();
    assert_eq!(first, "[Content_Types].xml");
}

#[test]
fn test_write_workbook_to_file() {
    let mut sheets = IndexMap::new();
    sheets.insert(
        "Zeta".to_string(),
        vec![vec![CellValue::from("z")], vec![CellValue::from(26)]],
    );
    sheets.insert("Alpha".to_string(), vec![vec![CellValue::from("a")]]);

    let file = NamedTempFile::new().unwrap();
    write_workbook(sheets, file.path()).unwrap();

    let loaded = Workbook::load(file.path()).unwrap();
    assert_eq!(loaded.sheet_names(), vec!["Zeta", "Alpha"]);
    let zeta = loaded.get_sheet_by_name("Zeta").unwrap();
    assert_eq!(zeta.get_cell_value(2, 1), Some(&CellValue::Number(26.0)));
}

#[test]
fn test_write_workbook_bad_destination() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("missing").join("out.xlsx");
    let err = write_workbook(IndexMap::new(), &destination).unwrap_err();
    assert!(matches!(err, migscan_core::CodecError::Io(_)));
    assert!(!destination.exists());
}

#[test]
fn test_inspector_reads_own_output() {
    let bytes = sample_workbook(4).save_to_bytes().unwrap();
    let inspection = inspect_xlsx_bytes(&bytes).unwrap();
    assert_eq!(inspection.sheet_count, 4);
    assert!(!inspection.encrypted);

    let empty = Workbook::new().save_to_bytes().unwrap();
    assert_eq!(inspect_xlsx_bytes(&empty).unwrap().sheet_count, 0);
}

#[test]
fn test_compression_levels_load_back() {
    for level in [
        CompressionLevel::None,
        CompressionLevel::Fast,
        CompressionLevel::Default,
        CompressionLevel::Best,
    ] {
        let mut wb = sample_workbook(2);
        wb.set_options(WriteOptions::new().compression(level));
        let loaded = Workbook::load_from_bytes(&wb.save_to_bytes().unwrap()).unwrap();
        assert_eq!(
            loaded.worksheets(),
            sample_workbook(2).worksheets(),
            "level {:?}",
            level
        );
    }
}

#[test]
fn test_migration_report_opens_in_calamine() {
    let record = FileRecord {
        path: "/share/a.docx".into(),
        filename: "a.docx".into(),
        size_mb: Some(2.5),
        extension: "docx".into(),
        created: "2024-01-01".into(),
        modified: "2024-01-02".into(),
        issues: vec!["Encrypted".into()],
    };
    let mut count_by_type = IndexMap::new();
    count_by_type.insert("docx".to_string(), 1);
    let summary = Summary {
        total_files: 1,
        total_size_mb: 2.5,
        files_with_issues: 1,
        count_by_type,
    };

    let file = NamedTempFile::new().unwrap();
    migration_report(&[record], &summary).save(file.path()).unwrap();

    let mut xlsx: Xlsx<_> = calamine::open_workbook(file.path()).unwrap();
    assert_eq!(
        xlsx.sheet_names(),
        vec!["File Inventory".to_string(), "Summary".to_string()]
    );
    let inventory = xlsx.worksheet_range("File Inventory").unwrap();
    assert_eq!(inventory.get_value((1, 2)), Some(&Data::String("2.50".into())));
    let totals = xlsx.worksheet_range("Summary").unwrap();
    assert_eq!(totals.get_value((1, 1)), Some(&Data::Float(1.0)));
    assert_eq!(totals.get_value((6, 0)), Some(&Data::String("docx".into())));
}
