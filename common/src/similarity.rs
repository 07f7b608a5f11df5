//! 特性類似度モジュール
//!
//! 品名のトークンとカテゴリ特性値の一致数から、自社品目ごとの
//! 特性一致率（PSP: matched / total * 100）を算出する。
//!
//! 同じ入力に対して常に同じ結果（カテゴリ選択・並び順）を返す。

use crate::catalog::{Catalog, Id, OwnItem};
use std::collections::BTreeMap;

/// 品名を空白で分割
pub fn tokenize(name: &str) -> Vec<&str> {
    name.split_whitespace().collect()
}

/// トークンから推定したカテゴリ
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMatch {
    pub category_id: Id,
    /// トークンと一致したこのカテゴリの特性値ID
    pub values: Vec<Id>,
}

impl CategoryMatch {
    pub fn tally(&self) -> usize {
        self.values.len()
    }
}

/// 品目ごとのスコア
#[derive(Debug, Clone)]
pub struct ItemScore<'a> {
    pub item: &'a OwnItem,
    pub matched: usize,
    pub psp: f64,
}

/// 一致した特性値が最も多いカテゴリを選ぶ
///
/// 同数の場合はIDの大きいカテゴリ。
pub fn select_category(catalog: &Catalog, tokens: &[&str]) -> Option<CategoryMatch> {
    let mut tally: BTreeMap<Id, Vec<Id>> = BTreeMap::new();
    for value in catalog.values_matching(tokens) {
        if let Some(category_id) = catalog.category_of_value(value.id) {
            tally.entry(category_id).or_default().push(value.id);
        }
    }

    let mut best: Option<CategoryMatch> = None;
    for (category_id, values) in tally {
        let better = best
            .as_ref()
            .map(|b| values.len() >= b.tally())
            .unwrap_or(true);
        if better {
            best = Some(CategoryMatch { category_id, values });
        }
    }
    best
}

/// カテゴリ内の対象品目をスコアリング（入力順を維持）
pub fn score_items<'a>(
    catalog: &Catalog,
    eligible: &[&'a OwnItem],
    category: &CategoryMatch,
) -> Vec<ItemScore<'a>> {
    let total = catalog.property_count(category.category_id);
    if total == 0 {
        return Vec::new();
    }

    eligible
        .iter()
        .copied()
        .filter(|item| item.category_id == Some(category.category_id))
        .map(|item| {
            let matched = item
                .properties
                .iter()
                .filter(|v| category.values.contains(*v))
                .count();
            ItemScore {
                item,
                matched,
                psp: matched as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}

/// 閾値以上の類似品目を一致数の多い順に返す
pub fn similar_items<'a>(
    catalog: &Catalog,
    eligible: &[&'a OwnItem],
    name: &str,
    psp_threshold: f64,
) -> Vec<ItemScore<'a>> {
    let tokens = tokenize(name);
    if tokens.is_empty() {
        return Vec::new();
    }
    let Some(category) = select_category(catalog, &tokens) else {
        return Vec::new();
    };

    let mut scores: Vec<_> = score_items(catalog, eligible, &category)
        .into_iter()
        .filter(|s| s.matched > 0 && s.psp >= psp_threshold)
        .collect();
    // stable sort: 同数は eligible の順序
    scores.sort_by(|a, b| b.matched.cmp(&a.matched));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4特性のカテゴリと、3特性が一致する品目
    fn breaker_catalog() -> (Catalog, Id) {
        let mut catalog = Catalog::default();
        let cat = catalog.get_or_create_category("Автоматические выключатели");
        let poles = catalog.get_or_create_property(cat, "Полюса");
        let current = catalog.get_or_create_property(cat, "Ток");
        let curve = catalog.get_or_create_property(cat, "Характеристика");
        let capacity = catalog.get_or_create_property(cat, "Отключающая способность");

        let v_poles = catalog.get_or_create_value(poles, "1P");
        let v_current = catalog.get_or_create_value(current, "16A");
        let v_curve = catalog.get_or_create_value(curve, "C");
        let v_capacity = catalog.get_or_create_value(capacity, "4,5kA");

        let full = catalog.upsert_own_item(OwnItem {
            code: "BA47-29-1P-16".to_string(),
            name: "ВА47-29 1P 16A".to_string(),
            category_id: Some(cat),
            ..Default::default()
        });
        for v in [v_poles, v_current, v_curve, v_capacity] {
            catalog.assign_own_item_value(full, v);
        }

        let partial = catalog.upsert_own_item(OwnItem {
            code: "BA47-29-1P-16-B".to_string(),
            name: "ВА47-29 1P 16A B".to_string(),
            category_id: Some(cat),
            ..Default::default()
        });
        catalog.assign_own_item_value(partial, v_poles);

        (catalog, cat)
    }

    #[test]
    fn test_tokenize_whitespace() {
        assert_eq!(tokenize("  S201  C16\t1P "), vec!["S201", "C16", "1P"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_select_category_by_tally() {
        let (catalog, cat) = breaker_catalog();
        let selected = select_category(&catalog, &["Автомат", "1P", "16A", "C"]).unwrap();
        assert_eq!(selected.category_id, cat);
        assert_eq!(selected.tally(), 3);
    }

    #[test]
    fn test_select_category_tie_prefers_larger_id() {
        let mut catalog = Catalog::default();
        let first = catalog.get_or_create_category("Первая");
        let second = catalog.get_or_create_category("Вторая");
        let p1 = catalog.get_or_create_property(first, "Цвет");
        let p2 = catalog.get_or_create_property(second, "Размер");
        catalog.get_or_create_value(p2, "XL");
        catalog.get_or_create_value(p1, "белый");

        let selected = select_category(&catalog, &["белый", "XL"]).unwrap();
        assert!(first < second);
        assert_eq!(selected.category_id, second);
    }

    #[test]
    fn test_select_category_none_when_no_values_match() {
        let (catalog, _) = breaker_catalog();
        assert!(select_category(&catalog, &["кабель"]).is_none());
    }

    #[test]
    fn test_psp_three_of_four() {
        let (catalog, _) = breaker_catalog();
        let eligible = catalog.eligible_own_items(&[]);

        let scores = similar_items(&catalog, &eligible, "Выключатель 1P 16A C", 70.0);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].item.code, "BA47-29-1P-16");
        assert_eq!(scores[0].matched, 3);
        assert!((scores[0].psp - 75.0).abs() < f64::EPSILON);

        let strict = similar_items(&catalog, &eligible, "Выключатель 1P 16A C", 80.0);
        assert!(strict.is_empty());
    }

    #[test]
    fn test_similar_items_sorted_by_matched_count() {
        let (catalog, _) = breaker_catalog();
        let eligible = catalog.eligible_own_items(&[]);

        let scores = similar_items(&catalog, &eligible, "1P 16A", 0.0);
        let codes: Vec<_> = scores.iter().map(|s| s.item.code.as_str()).collect();
        assert_eq!(codes, vec!["BA47-29-1P-16", "BA47-29-1P-16-B"]);
        assert_eq!(scores[1].matched, 1);
    }

    #[test]
    fn test_similar_items_deterministic() {
        let (catalog, _) = breaker_catalog();
        let eligible = catalog.eligible_own_items(&[]);

        let first: Vec<_> = similar_items(&catalog, &eligible, "1P 16A C", 10.0)
            .iter()
            .map(|s| s.item.id)
            .collect();
        let second: Vec<_> = similar_items(&catalog, &eligible, "1P 16A C", 10.0)
            .iter()
            .map(|s| s.item.id)
            .collect();
        assert_eq!(first, second);
    }
}
