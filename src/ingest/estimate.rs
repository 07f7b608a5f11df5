//! 見積の読み込み
//!
//! 見出しは7行目。「Ед. изм.」「Кол-во」は競合側と自社側に2回現れ、
//! 1回目が競合、2回目が自社の列。

use super::{cell, parse_number, read_sheet, HeaderIndex};
use crate::error::{EquipMatchError, Result};
use equip_match_common::layout::{ColumnSource, FIRST_DATA_ROW, HEADER_ROW, REPORT_COLUMNS, SHEET_NAME};
use equip_match_common::EstimateRow;
use std::collections::HashMap;
use std::path::Path;

/// 列の出所ごとの列番号
fn locate_columns(index: &HeaderIndex) -> HashMap<ColumnSource, usize> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut located = HashMap::new();
    for column in REPORT_COLUMNS.iter() {
        let occurrence = seen.entry(column.label).or_insert(0);
        if let Some(col) = index.nth(column.label, *occurrence) {
            located.insert(column.source, col);
        }
        *occurrence += 1;
    }
    located
}

/// 見積ファイルを再計算の入力行に変換
pub fn read_estimate(path: &Path) -> Result<Vec<EstimateRow>> {
    let grid = read_sheet(path, SHEET_NAME)?;
    let header = grid.row(HEADER_ROW as usize).ok_or_else(|| {
        EquipMatchError::InvalidUploadData(format!("見出し行（{}行目）がありません", HEADER_ROW + 1))
    })?;
    let index = HeaderIndex::new(header);
    let columns = locate_columns(&index);

    for required in [ColumnSource::CompCode, ColumnSource::CompName] {
        if !columns.contains_key(&required) {
            let label = REPORT_COLUMNS
                .iter()
                .find(|c| c.source == required)
                .map(|c| c.label)
                .unwrap_or_default();
            return Err(EquipMatchError::InvalidUploadData(format!(
                "列 \"{}\" がありません。見積テンプレートを確認してください",
                label
            )));
        }
    }

    let text = |row: &[String], source: ColumnSource| cell(row, columns.get(&source).copied()).to_string();
    let number = |row: &[String], source: ColumnSource| parse_number(cell(row, columns.get(&source).copied()));

    let rows = grid
        .rows_from(FIRST_DATA_ROW as usize)
        .map(|(absolute, row)| EstimateRow {
            index: absolute - FIRST_DATA_ROW as usize,
            comp_code: text(row, ColumnSource::CompCode),
            comp_name: text(row, ColumnSource::CompName),
            comp_unit: text(row, ColumnSource::CompUnit),
            comp_count: number(row, ColumnSource::CompCount),
            our_code: text(row, ColumnSource::OurCode),
            our_name: text(row, ColumnSource::OurName),
            our_unit: text(row, ColumnSource::OurUnit),
            our_count: number(row, ColumnSource::OurCount),
            our_cost: number(row, ColumnSource::OurCost),
            our_cost_amount: number(row, ColumnSource::OurCostAmount),
            comment: text(row, ColumnSource::Comment),
            availability_status: text(row, ColumnSource::AvailabilityStatus),
            promotion: text(row, ColumnSource::Promotion),
            analogues: Vec::new(),
            exactly_match: None,
        })
        .collect();
    Ok(rows)
}
