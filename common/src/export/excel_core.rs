//! 再計算帳票のExcel生成（共通ライブラリ）
//!
//! layout.rs の列定義を使用して14列の帳票を生成

use crate::layout::{
    ColumnSource, ReportColumn, BRANDING_COL, FIRST_DATA_ROW, FONT_NAME, FONT_SIZE,
    HEADER_ROW, REPORT_COLUMNS, SHEET_NAME,
};
use crate::types::{Branding, EstimateRow};
use rust_xlsxwriter::*;

/// セル値
enum CellValue<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

fn text(value: &str) -> CellValue<'_> {
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value)
    }
}

fn number(value: Option<f64>) -> CellValue<'static> {
    value.map(CellValue::Number).unwrap_or(CellValue::Empty)
}

/// 列に対応する行の値を取得
fn cell_value<'a>(row: &'a EstimateRow, position: usize, source: ColumnSource) -> CellValue<'a> {
    match source {
        ColumnSource::RowNumber => CellValue::Number((position + 1) as f64),
        ColumnSource::CompCode => text(&row.comp_code),
        ColumnSource::CompName => text(&row.comp_name),
        ColumnSource::CompUnit => text(&row.comp_unit),
        ColumnSource::CompCount => number(row.comp_count),
        ColumnSource::OurCode => text(&row.our_code),
        ColumnSource::OurName => text(&row.our_name),
        ColumnSource::OurUnit => text(&row.our_unit),
        ColumnSource::OurCount => number(row.our_count),
        ColumnSource::OurCost => number(row.our_cost),
        ColumnSource::OurCostAmount => number(row.our_cost_amount),
        ColumnSource::Comment => text(&row.comment),
        ColumnSource::AvailabilityStatus => text(&row.availability_status),
        ColumnSource::Promotion => text(&row.promotion),
    }
}

fn base_format() -> Format {
    Format::new()
        .set_font_name(FONT_NAME)
        .set_font_size(FONT_SIZE)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
}

fn header_format(column: &ReportColumn) -> Format {
    base_format()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(Color::RGB(column.group.header_color()))
        .set_border(FormatBorder::Thick)
}

fn cell_format(column: &ReportColumn) -> Format {
    let format = base_format()
        .set_background_color(Color::RGB(column.group.cell_color()))
        .set_border(FormatBorder::Thin);
    let format = if column.centered {
        format.set_align(FormatAlign::Center)
    } else {
        format.set_align(FormatAlign::Left)
    };
    if column.group_start {
        format.set_border_left(FormatBorder::Thick)
    } else {
        format
    }
}

/// 帳票をバッファに生成
///
/// # Arguments
/// * `rows` - 再計算後の見積行（入力順）
/// * `branding` - G1:G3 に表示する連絡先
pub fn generate_report_buffer(rows: &[EstimateRow], branding: &Branding) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .map_err(|e| format!("シート名設定エラー: {}", e))?;

    for (col, column) in REPORT_COLUMNS.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, column.width)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
    }

    // ブランド表示
    let branding_format = base_format().set_bold();
    for (row, line) in branding.lines().iter().enumerate() {
        worksheet
            .write_string_with_format(row as u32, BRANDING_COL, *line, &branding_format)
            .map_err(|e| format!("ブランド書き込みエラー: {}", e))?;
    }

    // 見出し
    for (col, column) in REPORT_COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(HEADER_ROW, col as u16, column.label, &header_format(column))
            .map_err(|e| format!("見出し書き込みエラー: {}", e))?;
    }

    // 列ごとのフォーマットは行に依存しない
    let formats: Vec<Format> = REPORT_COLUMNS.iter().map(cell_format).collect();

    for (position, row) in rows.iter().enumerate() {
        let excel_row = FIRST_DATA_ROW + position as u32;
        for (col, column) in REPORT_COLUMNS.iter().enumerate() {
            let format = &formats[col];
            let col = col as u16;
            let written = match cell_value(row, position, column.source) {
                CellValue::Text(value) => {
                    worksheet.write_string_with_format(excel_row, col, value, format)
                }
                CellValue::Number(value) => {
                    worksheet.write_number_with_format(excel_row, col, value, format)
                }
                CellValue::Empty => worksheet.write_blank(excel_row, col, format),
            };
            written.map_err(|e| format!("セル書き込みエラー: {}", e))?;
        }
    }

    // バッファに書き出し
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_report_buffer_empty() {
        let buffer = generate_report_buffer(&[], &Branding::default()).unwrap();
        // xlsx は zip
        assert_eq!(&buffer[..2], b"PK");
    }

    #[test]
    fn test_generate_report_buffer_with_rows() {
        let rows = vec![
            EstimateRow {
                comp_code: "S201-C16".to_string(),
                comp_name: "Автомат S201 C16".to_string(),
                comp_unit: "шт".to_string(),
                comp_count: Some(10.0),
                our_code: "MVA20-1-016-C".to_string(),
                our_count: Some(10.0),
                our_cost: Some(120.0),
                our_cost_amount: Some(1200.0),
                ..Default::default()
            },
            EstimateRow {
                comp_code: "Раздел 2".to_string(),
                ..Default::default()
            },
        ];
        let buffer = generate_report_buffer(&rows, &Branding::default()).unwrap();
        assert!(buffer.len() > 1000);
    }

    #[test]
    fn test_cell_value_row_number_is_one_based() {
        let row = EstimateRow::default();
        match cell_value(&row, 0, ColumnSource::RowNumber) {
            CellValue::Number(n) => assert_eq!(n, 1.0),
            _ => panic!("行番号は数値"),
        }
        assert!(matches!(cell_value(&row, 0, ColumnSource::OurCost), CellValue::Empty));
    }
}
