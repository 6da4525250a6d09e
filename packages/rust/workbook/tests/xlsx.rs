// Reads workbooks written by umya-spreadsheet back through calamine.

use std::path::PathBuf;

use chrono::NaiveDate;
use opds_export_workbook::{Cell, Workbook};

fn temp_xlsx(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("opds-workbook-test-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn reads_sheets_headers_and_typed_cells() {
    let path = temp_xlsx("courses.xlsx");

    let mut book = umya_spreadsheet::new_file();
    let sh = book.new_sheet("Grade 1").expect("add sheet");
    sh.get_cell_mut((1, 1)).set_value("lesson_id");
    sh.get_cell_mut((2, 1)).set_value("title ");
    sh.get_cell_mut((3, 1)).set_value("modified");
    sh.get_cell_mut((1, 2)).set_value_number(101);
    sh.get_cell_mut((2, 2)).set_value("  Counting  ");
    sh.get_cell_mut((3, 2)).set_value_number(44986);
    let _ = sh
        .get_style_mut("C2")
        .get_number_format_mut()
        .set_format_code(umya_spreadsheet::NumberingFormat::FORMAT_DATE_XLSX14);
    umya_spreadsheet::writer::xlsx::write(&book, &path).expect("write xlsx");

    let mut wb = Workbook::open(&path).expect("open via calamine");
    assert_eq!(wb.sheet_names(), ["Sheet1", "Grade 1"]);

    let sheet = wb.load_sheet("Grade 1").unwrap();
    assert_eq!(sheet.headers(), ["lesson_id", "title", "modified"]);

    let record = sheet.records().next().expect("one data row");
    assert_eq!(record.get("lesson_id").unwrap().as_text(), "101");
    assert_eq!(record.get("title"), Some(&Cell::Text("Counting".into())));
    assert_eq!(record.get("title "), None);

    let expected = NaiveDate::from_ymd_opt(2023, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(record.get("modified").unwrap().as_datetime(), Some(expected));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn unreadable_file_is_fatal() {
    let path = temp_xlsx("garbage.xlsx");
    std::fs::write(&path, b"not a spreadsheet").unwrap();

    assert!(Workbook::open(&path).is_err());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
