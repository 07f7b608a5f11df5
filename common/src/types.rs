//! 見積行の型定義
//!
//! 再計算ジョブの入出力となる1行分のデータ:
//! - comp_*: 競合他社の品目（入力）
//! - our_*: 自社品目（照合結果で上書き）

use crate::catalog::OwnItem;
use serde::{Deserialize, Serialize};

/// 在庫あり表示
pub const AVAILABLE_LABEL: &str = "В наличии";
/// 在庫なし表示
pub const UNAVAILABLE_LABEL: &str = "Нет в наличии";

/// 帳票右上（G1:G3）の連絡先表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub contact: String,
    pub phone: String,
    pub site: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            contact: "Контактный телефон:".to_string(),
            phone: "7 (495) 542-22-22".to_string(),
            site: "www.iek.ru".to_string(),
        }
    }
}

impl Branding {
    pub fn lines(&self) -> [&str; 3] {
        [&self.contact, &self.phone, &self.site]
    }
}

/// 見積の1行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateRow {
    /// 元ファイルでの行番号（0始まり）
    pub index: usize,

    pub comp_code: String,        // 競合品番
    pub comp_name: String,        // 競合品名
    pub comp_unit: String,        // 単位
    pub comp_count: Option<f64>,  // 数量

    pub our_code: String,
    pub our_name: String,
    pub our_unit: String,
    pub our_count: Option<f64>,
    pub our_cost: Option<f64>,         // 単価（税込）
    pub our_cost_amount: Option<f64>,  // 金額（税込）

    pub comment: String,
    pub availability_status: String,
    pub promotion: String,

    /// 代替候補の品番
    pub analogues: Vec<String>,

    /// 照合済みの場合のみ設定（true: 完全一致系、false: 特性類似）
    pub exactly_match: Option<bool>,
}

impl EstimateRow {
    /// 単位も数量もない行（見出し・装飾行）
    pub fn is_decoration(&self) -> bool {
        let has_unit = !self.comp_unit.trim().is_empty();
        let has_count = self.comp_count.map(|c| c != 0.0).unwrap_or(false);
        !has_unit && !has_count
    }

    /// 照合した自社品目で出力列を上書きする
    pub fn apply_match(&mut self, item: &OwnItem, alternates: &[&OwnItem], exact: bool) {
        let count = match self.comp_count {
            Some(requested) if requested != 0.0 => requested.min(item.count as f64),
            _ => 0.0,
        };

        self.our_code = item.code.clone();
        self.our_name = item.name.clone();
        self.our_unit = item.unit.clone();
        self.our_count = Some(count);
        self.our_cost = Some(item.cost);
        self.our_cost_amount = Some(item.cost * count);
        self.comment = item.comment.clone();
        self.availability_status = if item.is_available() {
            AVAILABLE_LABEL.to_string()
        } else {
            UNAVAILABLE_LABEL.to_string()
        };
        self.promotion = if item.is_promotion {
            item.promotion_description.clone()
        } else {
            String::new()
        };
        self.analogues = alternates.iter().map(|a| a.code.clone()).collect();
        self.exactly_match = Some(exact);
    }
}
