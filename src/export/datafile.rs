//! カタログのデータファイル出力
//!
//! 取込テンプレートと同じ見出しで DATA シートに書き出すため、
//! 出力したファイルはそのまま再取込できる。

use crate::error::{EquipMatchError, Result};
use crate::ingest::templates::{
    UploadKind, CATEGORY_COLUMNS, COMPETITOR_COLUMNS, DATA_SHEET, KEYWORD_COLUMNS, OWN_COLUMNS,
};
use chrono::{DateTime, Local};
use equip_match_common::catalog::Id;
use equip_match_common::Catalog;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

enum DataCell {
    Text(String),
    Number(f64),
}

impl From<&str> for DataCell {
    fn from(value: &str) -> Self {
        DataCell::Text(value.to_string())
    }
}

impl From<String> for DataCell {
    fn from(value: String) -> Self {
        DataCell::Text(value)
    }
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<DataCell>>,
}

impl Table {
    fn new(columns: &[&str]) -> Self {
        Self {
            headers: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// データファイル名: equip_match_<kind>_<YYYY-MM-DD_HH-MM>.xlsx
pub fn datafile_name(kind: UploadKind, at: DateTime<Local>) -> String {
    format!("equip_match_{}_{}.xlsx", kind, at.format("%Y-%m-%d_%H-%M"))
}

/// 特性列を含める場合は単一カテゴリに限る
fn single_category(
    category_ids: impl Iterator<Item = Option<Id>>,
    kind: UploadKind,
) -> Result<Option<Id>> {
    let distinct: BTreeSet<Option<Id>> = category_ids.collect();
    if distinct.len() > 1 {
        return Err(EquipMatchError::MultiCategoryDownload(format!(
            "{}: {} カテゴリ",
            kind,
            distinct.len()
        )));
    }
    Ok(distinct.into_iter().next().flatten())
}

/// カテゴリの特性名（名前順）と、品目の特性値 → 列の値
fn property_columns(catalog: &Catalog, category_id: Option<Id>) -> Vec<(Id, String)> {
    category_id
        .map(|id| {
            catalog
                .properties_of(id)
                .into_iter()
                .map(|p| (p.id, p.name.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn property_cells(catalog: &Catalog, columns: &[(Id, String)], values: &[Id]) -> Vec<DataCell> {
    let by_property: HashMap<Id, &str> = catalog
        .describe_values(values)
        .into_iter()
        .map(|(p, v)| (p.id, v.value.as_str()))
        .collect();
    columns
        .iter()
        .map(|(id, _)| DataCell::from(by_property.get(id).copied().unwrap_or("")))
        .collect()
}

fn category_name(catalog: &Catalog, id: Option<Id>) -> String {
    id.and_then(|id| catalog.category(id))
        .map(|c| c.name.clone())
        .unwrap_or_default()
}

fn own_table(catalog: &Catalog, without_properties: bool) -> Result<Table> {
    let items = catalog.own_items();
    let columns = if without_properties {
        Vec::new()
    } else {
        property_columns(catalog, single_category(items.iter().map(|i| i.category_id), UploadKind::Own)?)
    };

    let mut table = Table::new(&OWN_COLUMNS);
    table.headers.extend(columns.iter().map(|(_, name)| name.clone()));
    for item in items {
        let mut row = vec![
            DataCell::from(item.code.as_str()),
            DataCell::from(item.name.as_str()),
            DataCell::from(category_name(catalog, item.category_id)),
            DataCell::from(
                item.model_id
                    .and_then(|id| catalog.model(id))
                    .map(|m| m.name.clone())
                    .unwrap_or_default(),
            ),
            DataCell::from(item.unit.as_str()),
            DataCell::Number(item.count as f64),
            DataCell::Number(item.cost),
            DataCell::from(item.comment.as_str()),
            DataCell::from(if item.is_promotion { item.promotion_description.as_str() } else { "" }),
            DataCell::from(""),
        ];
        row.extend(property_cells(catalog, &columns, &item.properties));
        table.rows.push(row);
    }
    Ok(table)
}

fn competitor_table(catalog: &Catalog, without_properties: bool) -> Result<Table> {
    let items = catalog.competitor_items();
    let columns = if without_properties {
        Vec::new()
    } else {
        property_columns(
            catalog,
            single_category(items.iter().map(|i| i.category_id), UploadKind::Competitor)?,
        )
    };

    let mut table = Table::new(&COMPETITOR_COLUMNS);
    table.headers.extend(columns.iter().map(|(_, name)| name.clone()));
    for item in items {
        let company = item
            .competitor_id
            .and_then(|id| catalog.competitor(id))
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let mut row = vec![
            DataCell::from(company),
            DataCell::from(item.code.as_str()),
            DataCell::from(item.name.as_str()),
            DataCell::from(category_name(catalog, item.category_id)),
            DataCell::from(item.unit.as_str()),
        ];
        row.extend(property_cells(catalog, &columns, &item.properties));
        table.rows.push(row);
    }
    Ok(table)
}

fn keyword_table(catalog: &Catalog) -> Table {
    let mut table = Table::new(&KEYWORD_COLUMNS);
    let mut keywords: Vec<_> = catalog.keywords().iter().collect();
    keywords.sort_by_key(|k| (k.own_item_id, k.id));
    for keyword in keywords {
        let own_code = keyword
            .own_item_id
            .and_then(|id| catalog.own_item(id))
            .map(|i| i.code.clone())
            .unwrap_or_default();
        let comp_code = keyword
            .comp_item_id
            .and_then(|id| catalog.competitor_items().iter().find(|i| i.id == id))
            .map(|i| i.code.clone())
            .unwrap_or_default();
        table.rows.push(vec![
            DataCell::from(own_code),
            DataCell::from(comp_code),
            DataCell::from(keyword.text.as_str()),
            DataCell::from(keyword.kind.map(|k| k.sign()).unwrap_or("")),
        ]);
    }
    table
}

fn category_table(catalog: &Catalog) -> Table {
    let mut entries: Vec<(String, String, String)> = catalog
        .values()
        .iter()
        .filter_map(|value| {
            let property = catalog.property(value.property_id)?;
            let category = catalog.category(property.category_id)?;
            Some((category.name.clone(), property.name.clone(), value.value.clone()))
        })
        .collect();
    entries.sort();

    let mut table = Table::new(&CATEGORY_COLUMNS);
    for (category, property, value) in entries {
        table.rows.push(vec![category.into(), property.into(), value.into()]);
    }
    table
}

/// データファイルをバッファに生成
pub fn datafile_buffer(catalog: &Catalog, kind: UploadKind, without_properties: bool) -> Result<Vec<u8>> {
    let table = match kind {
        UploadKind::Own => own_table(catalog, without_properties)?,
        UploadKind::Competitor => competitor_table(catalog, without_properties)?,
        UploadKind::Keywords => keyword_table(catalog),
        UploadKind::Categories => category_table(catalog),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(DATA_SHEET)
        .map_err(|e| EquipMatchError::ExcelGeneration(format!("シート名設定エラー: {}", e)))?;

    let header_format = Format::new().set_bold();
    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(|e| EquipMatchError::ExcelGeneration(format!("見出し書き込みエラー: {}", e)))?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = r as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            let written = match value {
                DataCell::Text(text) if text.is_empty() => continue,
                DataCell::Text(text) => worksheet.write_string(excel_row, col as u16, text),
                DataCell::Number(number) => worksheet.write_number(excel_row, col as u16, *number),
            };
            written.map_err(|e| EquipMatchError::ExcelGeneration(format!("セル書き込みエラー: {}", e)))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| EquipMatchError::ExcelGeneration(format!("Excel保存エラー: {}", e)))
}

/// データファイルを書き出す
pub fn write_datafile(catalog: &Catalog, kind: UploadKind, without_properties: bool, path: &Path) -> Result<()> {
    let buffer = datafile_buffer(catalog, kind, without_properties)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, buffer)?;
    Ok(())
}
