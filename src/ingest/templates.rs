//! カタログ取込テンプレート
//!
//! いずれも DATA シートの1行目が見出し。
//! 必須列の欠落・カテゴリに存在しない特性列はファイル全体を拒否し、
//! 行単位の不備（品番なし・未知のカテゴリ等）は無効行として数えて読み飛ばす。
//! カタログはファイル全体の取込が成功した場合のみ更新される。

use super::{cell, parse_number, read_sheet, HeaderIndex};
use crate::error::{EquipMatchError, Result};
use equip_match_common::catalog::Id;
use equip_match_common::{Catalog, CompetitorItem, KeywordKind};
use serde::Serialize;
use std::path::Path;

pub const DATA_SHEET: &str = "DATA";

pub const OWN_CODE: &str = "Артикул";
pub const OWN_NAME: &str = "Наименование";
pub const OWN_CATEGORY: &str = "Категория";
pub const OWN_MODEL: &str = "Линейка";
pub const OWN_UNIT: &str = "Ед. изм.";
pub const OWN_STOCK: &str = "Остаток";
pub const OWN_COST: &str = "Цена с НДС";
pub const OWN_COMMENT: &str = "Комментарии";
pub const OWN_PROMOTION: &str = "Акции";
pub const OWN_PHOTO: &str = "Фото";

pub const OWN_COLUMNS: [&str; 10] = [
    OWN_CODE, OWN_NAME, OWN_CATEGORY, OWN_MODEL, OWN_UNIT, OWN_STOCK, OWN_COST, OWN_COMMENT,
    OWN_PROMOTION, OWN_PHOTO,
];

pub const COMP_COMPANY: &str = "Компания";
pub const COMP_CODE: &str = "Артикул";
pub const COMP_NAME: &str = "Наименование";
pub const COMP_CATEGORY: &str = "Категория";
pub const COMP_UNIT: &str = "Ед. изм.";

pub const COMPETITOR_COLUMNS: [&str; 5] = [COMP_COMPANY, COMP_CODE, COMP_NAME, COMP_CATEGORY, COMP_UNIT];

pub const KEY_OWN_CODE: &str = "Артикул ITK/IEK";
pub const KEY_COMP_CODE: &str = "Артикул конкурента";
pub const KEY_TEXT: &str = "Поисковой ключ";
pub const KEY_KIND: &str = "Тип ключа";

pub const KEYWORD_COLUMNS: [&str; 4] = [KEY_OWN_CODE, KEY_COMP_CODE, KEY_TEXT, KEY_KIND];

pub const TAX_CATEGORY: &str = "Категория";
pub const TAX_PROPERTY: &str = "Свойство";
pub const TAX_VALUE: &str = "Значение";

pub const CATEGORY_COLUMNS: [&str; 3] = [TAX_CATEGORY, TAX_PROPERTY, TAX_VALUE];

/// 取込テンプレートの種類
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Own,
    Competitor,
    Keywords,
    Categories,
}

impl std::str::FromStr for UploadKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "own" | "our" => Ok(UploadKind::Own),
            "competitor" | "comp" => Ok(UploadKind::Competitor),
            "keywords" | "keys" => Ok(UploadKind::Keywords),
            "categories" | "category" => Ok(UploadKind::Categories),
            _ => Err(format!(
                "Unknown kind: {}. Use own, competitor, keywords, or categories",
                s
            )),
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadKind::Own => write!(f, "own"),
            UploadKind::Competitor => write!(f, "competitor"),
            UploadKind::Keywords => write!(f, "keywords"),
            UploadKind::Categories => write!(f, "categories"),
        }
    }
}

/// 取込結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub kind: UploadKind,
    pub valid: usize,
    pub invalid: usize,
}

/// テンプレートを読み込み、カタログに反映する
pub fn upload(catalog: &mut Catalog, kind: UploadKind, path: &Path) -> Result<UploadReport> {
    let grid = read_sheet(path, DATA_SHEET)?;
    let header = grid
        .row(0)
        .ok_or_else(|| EquipMatchError::InvalidUploadData("見出し行がありません".into()))?;
    let index = HeaderIndex::new(header);
    let rows: Vec<&[String]> = grid.rows_from(1).map(|(_, row)| row).collect();

    let mut draft = catalog.clone();
    let (valid, invalid) = match kind {
        UploadKind::Own => upload_own(&mut draft, &index, &rows)?,
        UploadKind::Competitor => upload_competitor(&mut draft, &index, &rows)?,
        UploadKind::Keywords => upload_keywords(&mut draft, &index, &rows)?,
        UploadKind::Categories => upload_categories(&mut draft, &index, &rows)?,
    };
    *catalog = draft;

    tracing::info!(%kind, valid, invalid, path = %path.display(), "カタログ取込");
    Ok(UploadReport { kind, valid, invalid })
}

fn require_all(index: &HeaderIndex, columns: &[&str]) -> Result<Vec<usize>> {
    columns.iter().map(|c| index.require(c)).collect()
}

/// 行の特性列からカテゴリの特性値IDを得る
fn property_values(
    catalog: &mut Catalog,
    category_id: Id,
    properties: &[(usize, String)],
    row: &[String],
) -> Result<Vec<Id>> {
    let mut values = Vec::new();
    for (col, name) in properties {
        let value = cell(row, Some(*col));
        if value.is_empty() {
            continue;
        }
        let property_id = catalog
            .property_by_name(category_id, name)
            .map(|p| p.id)
            .ok_or_else(|| {
                let category = catalog
                    .category(category_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                EquipMatchError::InvalidUploadData(format!(
                    "カテゴリ \"{}\" に特性 \"{}\" がありません。特性を登録するか列を削除してください",
                    category, name
                ))
            })?;
        values.push(catalog.get_or_create_value(property_id, value));
    }
    Ok(values)
}

/// 自社カタログ
fn upload_own(catalog: &mut Catalog, index: &HeaderIndex, rows: &[&[String]]) -> Result<(usize, usize)> {
    let cols = require_all(index, &OWN_COLUMNS)?;
    let properties = index.extra_columns(&OWN_COLUMNS);
    let (mut valid, mut invalid) = (0, 0);

    for row in rows {
        let get = |i: usize| cell(row, Some(cols[i]));
        let (code, name, category) = (get(0), get(1), get(2));

        if code.is_empty() || name.is_empty() {
            invalid += 1;
            continue;
        }
        let category_id = if category.is_empty() {
            None
        } else {
            match catalog.category_by_name(category) {
                Some(c) => Some(c.id),
                None => {
                    invalid += 1;
                    continue;
                }
            }
        };

        let mut item = catalog.own_item_by_code(code).cloned().unwrap_or_default();
        item.code = code.to_string();
        item.name = name.to_string();
        item.category_id = category_id;
        if !get(3).is_empty() {
            item.model_id = Some(catalog.get_or_create_model(category_id, get(3)));
        }
        if !get(4).is_empty() {
            item.unit = get(4).to_string();
        }
        if let Some(stock) = parse_number(get(5)) {
            item.count = stock as i64;
        }
        if let Some(cost) = parse_number(get(6)) {
            item.cost = cost;
        }
        if !get(7).is_empty() {
            item.comment = get(7).to_string();
        }
        item.is_promotion = !get(8).is_empty();
        item.promotion_description = get(8).to_string();
        // 写真URL（get(9)）は扱わない

        let values = match category_id {
            Some(category_id) => property_values(catalog, category_id, &properties, row)?,
            None => Vec::new(),
        };
        let id = catalog.upsert_own_item(item);
        for value in values {
            catalog.assign_own_item_value(id, value);
        }
        valid += 1;
    }
    Ok((valid, invalid))
}

/// 競合カタログ
fn upload_competitor(
    catalog: &mut Catalog,
    index: &HeaderIndex,
    rows: &[&[String]],
) -> Result<(usize, usize)> {
    let cols = require_all(index, &COMPETITOR_COLUMNS)?;
    let properties = index.extra_columns(&COMPETITOR_COLUMNS);
    let (mut valid, mut invalid) = (0, 0);

    for row in rows {
        let get = |i: usize| cell(row, Some(cols[i]));
        let (company, code, name, category, unit) = (get(0), get(1), get(2), get(3), get(4));

        if code.is_empty() {
            invalid += 1;
            continue;
        }
        let category_id = if category.is_empty() {
            None
        } else {
            match catalog.category_by_name(category) {
                Some(c) => Some(c.id),
                None => {
                    invalid += 1;
                    continue;
                }
            }
        };
        let competitor_id = if company.is_empty() {
            None
        } else {
            Some(catalog.get_or_create_competitor(company))
        };

        let values = match category_id {
            Some(category_id) => property_values(catalog, category_id, &properties, row)?,
            None => Vec::new(),
        };
        let id = catalog.upsert_competitor_item(CompetitorItem {
            competitor_id,
            code: code.to_string(),
            name: name.to_string(),
            category_id,
            unit: unit.to_string(),
            ..Default::default()
        });
        for value in values {
            catalog.assign_competitor_item_value(id, value);
        }
        valid += 1;
    }
    Ok((valid, invalid))
}

/// 検索キー
fn upload_keywords(
    catalog: &mut Catalog,
    index: &HeaderIndex,
    rows: &[&[String]],
) -> Result<(usize, usize)> {
    let cols = require_all(index, &KEYWORD_COLUMNS)?;
    let (mut valid, mut invalid) = (0, 0);

    for row in rows {
        let get = |i: usize| cell(row, Some(cols[i]));
        let (own_code, comp_code, text, sign) = (get(0), get(1), get(2), get(3));

        if own_code.is_empty() || comp_code.is_empty() || text.is_empty() || sign.is_empty() {
            invalid += 1;
            continue;
        }
        let own_id = catalog.own_item_by_code(own_code).map(|i| i.id);
        let comp_id = catalog
            .competitor_items_with_code(comp_code)
            .first()
            .map(|i| i.id);
        let kind = KeywordKind::from_sign(sign);
        let (Some(own_id), Some(comp_id), Some(kind)) = (own_id, comp_id, kind) else {
            invalid += 1;
            continue;
        };

        catalog.upsert_keyword(text, Some(own_id), Some(comp_id), Some(kind));
        valid += 1;
    }
    Ok((valid, invalid))
}

/// カテゴリ・特性・値
fn upload_categories(
    catalog: &mut Catalog,
    index: &HeaderIndex,
    rows: &[&[String]],
) -> Result<(usize, usize)> {
    let cols = require_all(index, &CATEGORY_COLUMNS)?;
    let (mut valid, mut invalid) = (0, 0);

    for row in rows {
        let get = |i: usize| cell(row, Some(cols[i]));
        let (category, property, value) = (get(0), get(1), get(2));

        if category.is_empty() || property.is_empty() || value.is_empty() {
            invalid += 1;
            continue;
        }
        let category_id = catalog.get_or_create_category(category);
        let property_id = catalog.get_or_create_property(category_id, property);
        catalog.get_or_create_value(property_id, value);
        valid += 1;
    }
    Ok((valid, invalid))
}
