//! 照合カスケードモジュール
//!
//! 競合品目1行に対応する自社品目を、以下の順で探索する（最初に見つかった段で確定）:
//! 1. 自社品番の完全一致
//! 2. 自社品名の完全一致
//! 3. 競合品番 → 検索キー → 自社品目
//! 4. 競合品名 → 検索キー → 自社品目
//! 5. 検索キー（品番）
//! 6. 検索キー（品名）
//! 7. 特性類似度（PSP閾値以上）
//!
//! 副作用は持たない。結果の記録・通知は呼び出し側（再計算ジョブ）が行う。

use crate::catalog::{Catalog, Id, OwnItem};
use crate::similarity::similar_items;
use crate::types::EstimateRow;
use serde::{Deserialize, Serialize};

/// 照合段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    OwnCode,
    OwnName,
    CompCodeBridge,
    CompNameBridge,
    KeywordCode,
    KeywordName,
    PropertySimilarity,
}

impl MatchTier {
    /// 評価順
    pub const CASCADE: [MatchTier; 7] = [
        MatchTier::OwnCode,
        MatchTier::OwnName,
        MatchTier::CompCodeBridge,
        MatchTier::CompNameBridge,
        MatchTier::KeywordCode,
        MatchTier::KeywordName,
        MatchTier::PropertySimilarity,
    ];

    /// 特性類似度以外はすべて完全一致扱い
    pub fn is_exact(self) -> bool {
        !matches!(self, MatchTier::PropertySimilarity)
    }

    /// この段で候補を探す
    pub fn apply<'a>(
        self,
        eligible: &EligibleItems<'a>,
        query: &RowQuery<'_>,
        psp_threshold: f64,
    ) -> Option<MatchOutcome<'a>> {
        let catalog = eligible.catalog;

        let candidates = match self {
            MatchTier::OwnCode => {
                let code = query.code()?;
                let first = eligible.items.iter().copied().find(|i| i.code == code)?;
                return Some(MatchOutcome::single(first, self));
            }
            MatchTier::OwnName => {
                let name = query.name()?;
                let first = eligible.items.iter().copied().find(|i| i.name == name)?;
                return Some(MatchOutcome::single(first, self));
            }
            MatchTier::CompCodeBridge => {
                let comp = *catalog.competitor_items_with_code(query.code()?).first()?;
                eligible.linked_to_competitor_item(comp.id)
            }
            MatchTier::CompNameBridge => {
                let comp = *catalog.competitor_items_with_name(query.name()?).first()?;
                eligible.linked_to_competitor_item(comp.id)
            }
            MatchTier::KeywordCode => eligible.linked_to_keyword(query.code()?),
            MatchTier::KeywordName => eligible.linked_to_keyword(query.name()?),
            MatchTier::PropertySimilarity => {
                let mut scores =
                    similar_items(catalog, &eligible.items, query.name()?, psp_threshold).into_iter();
                let top = scores.next()?;
                return Some(MatchOutcome {
                    primary: top.item,
                    alternates: scores.map(|s| s.item).collect(),
                    tier: self,
                    psp: Some(top.psp),
                });
            }
        };

        MatchOutcome::split(candidates, self)
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::OwnCode => write!(f, "own-code"),
            MatchTier::OwnName => write!(f, "own-name"),
            MatchTier::CompCodeBridge => write!(f, "comp-code-bridge"),
            MatchTier::CompNameBridge => write!(f, "comp-name-bridge"),
            MatchTier::KeywordCode => write!(f, "keyword-code"),
            MatchTier::KeywordName => write!(f, "keyword-name"),
            MatchTier::PropertySimilarity => write!(f, "property-similarity"),
        }
    }
}

/// 照合に使う行の値（空欄は None 扱い）
#[derive(Debug, Clone, Copy)]
pub struct RowQuery<'r> {
    code: &'r str,
    name: &'r str,
}

impl<'r> RowQuery<'r> {
    pub fn new(code: &'r str, name: &'r str) -> Self {
        Self { code: code.trim(), name: name.trim() }
    }

    pub fn from_row(row: &'r EstimateRow) -> Self {
        Self::new(&row.comp_code, &row.comp_name)
    }

    pub fn code(&self) -> Option<&'r str> {
        Some(self.code).filter(|c| !c.is_empty())
    }

    pub fn name(&self) -> Option<&'r str> {
        Some(self.name).filter(|n| !n.is_empty())
    }
}

/// 照合対象の自社品目ビュー
pub struct EligibleItems<'a> {
    catalog: &'a Catalog,
    items: Vec<&'a OwnItem>,
}

impl<'a> EligibleItems<'a> {
    /// 指定の製品ラインを除いたビューを作る
    pub fn new(catalog: &'a Catalog, excluded_models: &[Id]) -> Self {
        Self {
            catalog,
            items: catalog.eligible_own_items(excluded_models),
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn items(&self) -> &[&'a OwnItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 指定IDの品目をビューの順序で返す
    fn restrict_to(&self, ids: &[Id]) -> Vec<&'a OwnItem> {
        self.items
            .iter()
            .copied()
            .filter(|i| ids.contains(&i.id))
            .collect()
    }

    fn linked_to_competitor_item(&self, comp_item_id: Id) -> Vec<&'a OwnItem> {
        let ids: Vec<Id> = self
            .catalog
            .keywords_for_competitor_item(comp_item_id)
            .iter()
            .filter_map(|k| k.own_item_id)
            .collect();
        self.restrict_to(&ids)
    }

    fn linked_to_keyword(&self, text: &str) -> Vec<&'a OwnItem> {
        let ids: Vec<Id> = self
            .catalog
            .keywords_with_text(text)
            .iter()
            .filter_map(|k| k.own_item_id)
            .collect();
        self.restrict_to(&ids)
    }
}

/// 照合結果
#[derive(Debug, Clone)]
pub struct MatchOutcome<'a> {
    pub primary: &'a OwnItem,
    pub alternates: Vec<&'a OwnItem>,
    pub tier: MatchTier,
    /// 特性類似度で見つかった場合の一致率
    pub psp: Option<f64>,
}

impl<'a> MatchOutcome<'a> {
    fn single(primary: &'a OwnItem, tier: MatchTier) -> Self {
        Self {
            primary,
            alternates: Vec::new(),
            tier,
            psp: None,
        }
    }

    /// 先頭を主候補、残りを代替候補に分ける
    fn split(candidates: Vec<&'a OwnItem>, tier: MatchTier) -> Option<Self> {
        let mut iter = candidates.into_iter();
        let primary = iter.next()?;
        Some(Self {
            primary,
            alternates: iter.collect(),
            tier,
            psp: None,
        })
    }

    pub fn exact(&self) -> bool {
        self.tier.is_exact()
    }
}

/// カスケードを順に評価し、最初に見つかった結果を返す
pub fn resolve<'a>(
    eligible: &EligibleItems<'a>,
    query: &RowQuery<'_>,
    psp_threshold: f64,
) -> Option<MatchOutcome<'a>> {
    MatchTier::CASCADE
        .iter()
        .find_map(|tier| tier.apply(eligible, query, psp_threshold))
}
