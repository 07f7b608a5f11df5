//! 帳票レイアウト定義
//!
//! 再計算結果シート（14列固定）の列順・見出し・列幅・配色グループ。
//! 見出し行は見積テンプレートと同じ位置・同じ表記なので、
//! 出力した帳票はそのまま見積として再読込できる。

/// シート名（見積テンプレートと共通）
pub const SHEET_NAME: &str = "Спецификация";

/// 見出し行（0始まり、Excel上は7行目）
pub const HEADER_ROW: u32 = 6;

/// データ開始行（0始まり、Excel上は8行目）
pub const FIRST_DATA_ROW: u32 = HEADER_ROW + 1;

/// ブランド表示の列（G列）
pub const BRANDING_COL: u16 = 6;

/// フォント
pub const FONT_NAME: &str = "Calibri";
pub const FONT_SIZE: f64 = 9.0;

/// 列の配色グループ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnGroup {
    /// 競合側（白）
    Neutral,
    /// 自社側
    Vendor,
    /// コメント・在庫状況
    Annotation,
    /// キャンペーン
    Promotion,
}

impl ColumnGroup {
    /// 見出しセルの背景色
    pub fn header_color(&self) -> u32 {
        match self {
            ColumnGroup::Neutral => 0xFFFFFF,
            ColumnGroup::Vendor => 0xF6BA00,
            ColumnGroup::Annotation => 0xB8CCE4,
            ColumnGroup::Promotion => 0xFAC090,
        }
    }

    /// データセルの背景色
    pub fn cell_color(&self) -> u32 {
        match self {
            ColumnGroup::Neutral => 0xFFFFFF,
            ColumnGroup::Vendor => 0xFFF1C5,
            ColumnGroup::Annotation => 0xDCE6F1,
            ColumnGroup::Promotion => 0xFDEADA,
        }
    }
}

/// 列の値の出所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnSource {
    RowNumber,
    CompCode,
    CompName,
    CompUnit,
    CompCount,
    OurCode,
    OurName,
    OurUnit,
    OurCount,
    OurCost,
    OurCostAmount,
    Comment,
    AvailabilityStatus,
    Promotion,
}

/// 列定義
#[derive(Debug, Clone, Copy)]
pub struct ReportColumn {
    pub label: &'static str,
    pub source: ColumnSource,
    pub width: f64,
    pub group: ColumnGroup,
    /// グループ先頭列（左罫線を太くする）
    pub group_start: bool,
    pub centered: bool,
}

const fn column(
    label: &'static str,
    source: ColumnSource,
    width: f64,
    group: ColumnGroup,
    group_start: bool,
    centered: bool,
) -> ReportColumn {
    ReportColumn { label, source, width, group, group_start, centered }
}

/// 帳票の14列（A〜N）
pub const REPORT_COLUMNS: [ReportColumn; 14] = [
    column("№ п.п.", ColumnSource::RowNumber, 6.0, ColumnGroup::Neutral, false, true),
    column("Артикул", ColumnSource::CompCode, 15.0, ColumnGroup::Neutral, false, false),
    column("Наименование/описание", ColumnSource::CompName, 20.0, ColumnGroup::Neutral, false, false),
    column("Ед. изм.", ColumnSource::CompUnit, 6.0, ColumnGroup::Neutral, false, true),
    column("Кол-во", ColumnSource::CompCount, 6.0, ColumnGroup::Neutral, false, true),
    column("Артикул ITK/IEK", ColumnSource::OurCode, 15.0, ColumnGroup::Vendor, true, false),
    column("Наименование ITK/IEK", ColumnSource::OurName, 20.0, ColumnGroup::Vendor, false, false),
    column("Ед. изм.", ColumnSource::OurUnit, 6.0, ColumnGroup::Vendor, false, true),
    column("Кол-во", ColumnSource::OurCount, 6.0, ColumnGroup::Vendor, false, true),
    column("Цена с НДС, руб.", ColumnSource::OurCost, 15.0, ColumnGroup::Vendor, false, true),
    column("Сумма с НДС, руб.", ColumnSource::OurCostAmount, 15.0, ColumnGroup::Vendor, false, true),
    column("Комментарии", ColumnSource::Comment, 20.0, ColumnGroup::Annotation, true, false),
    column("Статус наличия", ColumnSource::AvailabilityStatus, 15.0, ColumnGroup::Annotation, false, false),
    column("Акция", ColumnSource::Promotion, 15.0, ColumnGroup::Promotion, true, false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_contract() {
        let sources: Vec<_> = REPORT_COLUMNS.iter().map(|c| c.source).collect();
        assert_eq!(
            sources,
            vec![
                ColumnSource::RowNumber,
                ColumnSource::CompCode,
                ColumnSource::CompName,
                ColumnSource::CompUnit,
                ColumnSource::CompCount,
                ColumnSource::OurCode,
                ColumnSource::OurName,
                ColumnSource::OurUnit,
                ColumnSource::OurCount,
                ColumnSource::OurCost,
                ColumnSource::OurCostAmount,
                ColumnSource::Comment,
                ColumnSource::AvailabilityStatus,
                ColumnSource::Promotion,
            ]
        );
    }

    #[test]
    fn test_group_starts() {
        let starts: Vec<_> = REPORT_COLUMNS
            .iter()
            .enumerate()
            .filter(|(_, c)| c.group_start)
            .map(|(i, _)| i)
            .collect();
        // F, L, N
        assert_eq!(starts, vec![5, 11, 13]);
    }

    #[test]
    fn test_header_and_cell_tones_differ_except_neutral() {
        for group in [ColumnGroup::Vendor, ColumnGroup::Annotation, ColumnGroup::Promotion] {
            assert_ne!(group.header_color(), group.cell_color());
        }
        assert_eq!(ColumnGroup::Neutral.header_color(), ColumnGroup::Neutral.cell_color());
    }
}
