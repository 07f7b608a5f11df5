//! Excel取込
//!
//! - estimate: 見積（Спецификация シート）→ 再計算の入力行
//! - templates: カタログ取込テンプレート（DATA シート）

pub mod estimate;
pub mod templates;

pub use estimate::read_estimate;
pub use templates::{upload, UploadKind, UploadReport};

use crate::error::{EquipMatchError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref NUMBER_NOISE: Regex = Regex::new(r"[\s\u{00A0}]").unwrap();
}

/// 絶対座標に揃えたシートの文字列表
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    rows: Vec<Vec<String>>,
}

impl SheetGrid {
    fn from_range(range: &Range<Data>) -> Self {
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            rows.push(cells);
        }
        Self { rows }
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 指定行以降（空行を除く）
    pub fn rows_from(&self, index: usize) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(index)
            .filter(|(_, r)| r.iter().any(|c| !c.is_empty()))
            .map(|(i, r)| (i, r.as_slice()))
    }
}

/// シートを読み込む
pub fn read_sheet(path: &Path, sheet: &str) -> Result<SheetGrid> {
    if !path.exists() {
        return Err(EquipMatchError::FileNotFound(path.display().to_string()));
    }
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(EquipMatchError::InvalidUploadData(format!(
            "シート \"{}\" がありません: {}",
            sheet,
            path.display()
        )));
    }
    let range = workbook.worksheet_range(sheet)?;
    Ok(SheetGrid::from_range(&range))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// 見出しの比較用（空白の揺れと大文字小文字を無視）
pub fn normalize_header(header: &str) -> String {
    WHITESPACE.replace_all(header.trim(), " ").to_lowercase()
}

/// 数値セルを解釈（"1 234,5" 形式を含む）
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned = NUMBER_NOISE.replace_all(text, "").replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// 見出し行から列番号を引く
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    headers: Vec<String>,
    normalized: Vec<String>,
}

impl HeaderIndex {
    pub fn new(row: &[String]) -> Self {
        Self {
            headers: row.to_vec(),
            normalized: row.iter().map(|h| normalize_header(h)).collect(),
        }
    }

    /// n番目（0始まり）に現れる見出しの列
    pub fn nth(&self, header: &str, occurrence: usize) -> Option<usize> {
        let key = normalize_header(header);
        self.normalized
            .iter()
            .enumerate()
            .filter(|(_, h)| **h == key)
            .map(|(i, _)| i)
            .nth(occurrence)
    }

    pub fn find(&self, header: &str) -> Option<usize> {
        self.nth(header, 0)
    }

    /// 必須列を確認し、列番号を返す
    pub fn require(&self, header: &str) -> Result<usize> {
        self.find(header).ok_or_else(|| {
            EquipMatchError::InvalidUploadData(format!(
                "列 \"{}\" がありません。テンプレートを確認してください",
                header
            ))
        })
    }

    /// 指定した列以外の空でない見出し（特性列）
    pub fn extra_columns(&self, known: &[&str]) -> Vec<(usize, String)> {
        let known: Vec<String> = known.iter().map(|h| normalize_header(h)).collect();
        self.headers
            .iter()
            .zip(&self.normalized)
            .enumerate()
            .filter(|(_, (_, n))| !n.is_empty() && !known.contains(n))
            .map(|(i, (h, _))| (i, h.trim().to_string()))
            .collect()
    }
}

/// 行のセル（範囲外は空）
pub fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| row.get(i))
        .map(|s| s.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Ед.  изм. "), "ед. изм.");
        assert_eq!(normalize_header("Артикул ITK/IEK"), "артикул itk/iek");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number("1 234,5"), Some(1234.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("шт"), None);
    }

    #[test]
    fn test_header_index_occurrences() {
        let row: Vec<String> = ["Артикул", "Ед. изм.", "Кол-во", "Артикул ITK/IEK", "ед. изм.", "Кол-во"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let index = HeaderIndex::new(&row);
        assert_eq!(index.nth("Ед. изм.", 0), Some(1));
        assert_eq!(index.nth("Ед. изм.", 1), Some(4));
        assert_eq!(index.nth("Кол-во", 1), Some(5));
        assert_eq!(index.nth("Кол-во", 2), None);
        assert!(index.require("Фото").is_err());
    }

    #[test]
    fn test_extra_columns() {
        let row: Vec<String> = ["Артикул", "Наименование", "Полюса", "", "Ток"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let index = HeaderIndex::new(&row);
        let extra = index.extra_columns(&["Артикул", "Наименование"]);
        assert_eq!(extra, vec![(2, "Полюса".to_string()), (4, "Ток".to_string())]);
    }

    #[test]
    fn test_cell_text_integral_float() {
        assert_eq!(cell_text(&Data::Float(12345.0)), "12345");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::String("  x ".into())), "x");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
