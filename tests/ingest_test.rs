//! 見積・取込テンプレート読み込みの統合テスト
//!
//! rust_xlsxwriter で一時ファイルを作り、calamine 経由で読み戻す

use equip_match::common::layout::{HEADER_ROW, REPORT_COLUMNS, SHEET_NAME};
use equip_match::common::Catalog;
use equip_match::error::EquipMatchError;
use equip_match::ingest::templates::{
    CATEGORY_COLUMNS, COMPETITOR_COLUMNS, DATA_SHEET, KEYWORD_COLUMNS, OWN_COLUMNS,
};
use equip_match::ingest::{read_estimate, upload, UploadKind};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// 1シートのワークブックを書き出す（数値に見える値は数値セル）
fn write_sheet(path: &Path, sheet: &str, first_row: u32, rows: &[Vec<&str>]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let (r, c) = (first_row + r as u32, c as u16);
            match value.parse::<f64>() {
                Ok(n) => worksheet.write_number(r, c, n).unwrap(),
                Err(_) => worksheet.write_string(r, c, *value).unwrap(),
            };
        }
    }
    workbook.save(path).unwrap();
}

fn data_file(dir: &TempDir, name: &str, header: &[&str], rows: &[Vec<&str>]) -> PathBuf {
    let path = dir.path().join(name);
    let mut all = vec![header.to_vec()];
    all.extend(rows.iter().cloned());
    write_sheet(&path, DATA_SHEET, 0, &all);
    path
}

fn estimate_header() -> Vec<&'static str> {
    REPORT_COLUMNS.iter().map(|c| c.label).collect()
}

#[test]
fn test_read_estimate_from_template() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("estimate.xlsx");
    let mut rows = vec![estimate_header()];
    rows.push(vec!["1", "2CDS251001R0164", "S201 C16", "шт", "12"]);
    rows.push(vec![]);
    rows.push(vec!["", "Раздел 2"]);
    rows.push(vec!["3", "A9F74116", "iC60N 1P 16A C", "шт", "1 234,5"]);
    write_sheet(&path, SHEET_NAME, HEADER_ROW, &rows);

    let estimate = read_estimate(&path).unwrap();
    assert_eq!(estimate.len(), 3);

    assert_eq!(estimate[0].index, 0);
    assert_eq!(estimate[0].comp_code, "2CDS251001R0164");
    assert_eq!(estimate[0].comp_count, Some(12.0));
    assert!(estimate[0].our_code.is_empty());

    // 空行は読み飛ばすが位置は保つ
    assert_eq!(estimate[1].index, 2);
    assert!(estimate[1].is_decoration());

    assert_eq!(estimate[2].index, 3);
    assert_eq!(estimate[2].comp_count, Some(1234.5));
}

#[test]
fn test_duplicate_headers_map_to_competitor_then_own() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("estimate.xlsx");
    let rows = vec![
        estimate_header(),
        vec!["1", "C1", "Автомат", "шт", "4", "MVA-1", "ВА47", "компл", "2", "150", "300"],
    ];
    write_sheet(&path, SHEET_NAME, HEADER_ROW, &rows);

    let estimate = read_estimate(&path).unwrap();
    let row = &estimate[0];
    assert_eq!((row.comp_unit.as_str(), row.comp_count), ("шт", Some(4.0)));
    assert_eq!((row.our_unit.as_str(), row.our_count), ("компл", Some(2.0)));
    assert_eq!(row.our_cost_amount, Some(300.0));
}

#[test]
fn test_estimate_without_name_column_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("estimate.xlsx");
    let rows = vec![vec!["№ п.п.", "Артикул", "Ед. изм.", "Кол-во"], vec!["1", "C1", "шт", "1"]];
    write_sheet(&path, SHEET_NAME, HEADER_ROW, &rows);

    let err = read_estimate(&path).unwrap_err();
    assert!(matches!(err, EquipMatchError::InvalidUploadData(_)));
    assert!(err.to_string().contains("Наименование/описание"));
}

fn taxonomy(dir: &TempDir) -> PathBuf {
    data_file(
        dir,
        "categories.xlsx",
        &CATEGORY_COLUMNS,
        &[
            vec!["Автоматы", "Полюса", "1P"],
            vec!["Автоматы", "Ток", "16A"],
            vec!["Автоматы", "Ток", "25A"],
            vec!["Автоматы", "Характеристика", ""],
        ],
    )
}

#[test]
fn test_upload_sequence_builds_catalog() {
    let dir = tempdir().unwrap();
    let mut catalog = Catalog::default();

    let report = upload(&mut catalog, UploadKind::Categories, &taxonomy(&dir)).unwrap();
    assert_eq!((report.valid, report.invalid), (3, 1));

    let mut own_header = OWN_COLUMNS.to_vec();
    own_header.extend(["Полюса", "Ток"]);
    let own = data_file(
        &dir,
        "own.xlsx",
        &own_header,
        &[
            vec!["MVA20-1-016-C", "ВА47-29 1Р 16А", "Автоматы", "ВА47-29", "шт", "40", "120,5", "", "-10%", "", "1P", "16A"],
            vec!["", "Без артикула", "Автоматы"],
            vec!["X-1", "Неизвестная категория", "Щиты"],
        ],
    );
    let report = upload(&mut catalog, UploadKind::Own, &own).unwrap();
    assert_eq!((report.valid, report.invalid), (1, 2));

    let item = catalog.own_item_by_code("MVA20-1-016-C").unwrap();
    assert_eq!(item.count, 40);
    assert_eq!(item.cost, 120.5);
    assert!(item.is_promotion);
    assert_eq!(item.properties.len(), 2);
    assert!(item.model_id.is_some());

    let comp = data_file(
        &dir,
        "competitor.xlsx",
        &COMPETITOR_COLUMNS,
        &[vec!["ABB", "2CDS251001R0164", "S201 C16", "Автоматы", "шт"]],
    );
    upload(&mut catalog, UploadKind::Competitor, &comp).unwrap();
    assert_eq!(catalog.competitor_items().len(), 1);

    let keys = data_file(
        &dir,
        "keys.xlsx",
        &KEYWORD_COLUMNS,
        &[
            vec!["MVA20-1-016-C", "2CDS251001R0164", "S201", "n"],
            vec!["MVA20-1-016-C", "2CDS251001R0164", "S201", "X"],
            vec!["NOPE", "2CDS251001R0164", "S201", "C"],
        ],
    );
    let report = upload(&mut catalog, UploadKind::Keywords, &keys).unwrap();
    assert_eq!((report.valid, report.invalid), (1, 2));
    assert!(!catalog.keywords()[0].is_approved);
}

#[test]
fn test_rejected_file_leaves_catalog_unchanged() {
    let dir = tempdir().unwrap();
    let mut catalog = Catalog::default();
    upload(&mut catalog, UploadKind::Categories, &taxonomy(&dir)).unwrap();
    let before = serde_json::to_string(&catalog).unwrap();

    let mut header = OWN_COLUMNS.to_vec();
    header.push("Цвет");
    let own = data_file(
        &dir,
        "own.xlsx",
        &header,
        &[
            vec!["A1", "Первый", "", "", "шт", "1", "10"],
            vec!["A2", "Второй", "Автоматы", "", "шт", "1", "10", "", "", "", "белый"],
        ],
    );
    let err = upload(&mut catalog, UploadKind::Own, &own).unwrap_err();
    assert!(matches!(err, EquipMatchError::InvalidUploadData(_)));
    assert_eq!(serde_json::to_string(&catalog).unwrap(), before);
}

#[test]
fn test_missing_required_column_rejects_file() {
    let dir = tempdir().unwrap();
    let comp = data_file(
        &dir,
        "competitor.xlsx",
        &["Компания", "Артикул", "Наименование"],
        &[vec!["ABB", "C1", "S201"]],
    );
    let mut catalog = Catalog::default();
    let err = upload(&mut catalog, UploadKind::Competitor, &comp).unwrap_err();
    assert!(err.to_string().contains("Категория"));
    assert!(catalog.competitor_items().is_empty());
}

#[test]
fn test_upload_requires_data_sheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wrong.xlsx");
    write_sheet(&path, "Лист1", 0, &[CATEGORY_COLUMNS.to_vec()]);

    let err = upload(&mut Catalog::default(), UploadKind::Categories, &path).unwrap_err();
    assert!(matches!(err, EquipMatchError::InvalidUploadData(_)));
}
