//! 機器カタログモジュール
//!
//! 自社品目・競合品目・検索キー・カテゴリ特性（カテゴリ/特性/値）を保持する。
//! 照合エンジンからは読み取り専用で参照され、更新は取込処理のみが行う。

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// カタログ内の識別子
pub type Id = u64;

/// 機器カテゴリ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

/// カテゴリの特性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryProperty {
    pub id: Id,
    pub category_id: Id,
    pub name: String,
}

/// 特性の値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub id: Id,
    pub property_id: Id,
    pub value: String,
}

/// 製品ライン（照合対象からの除外単位）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentModel {
    pub id: Id,
    pub category_id: Option<Id>,
    pub name: String,
}

/// 自社品目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnItem {
    pub id: Id,
    /// 品番（一意）
    pub code: String,
    pub name: String,
    pub category_id: Option<Id>,
    pub model_id: Option<Id>,
    pub unit: String,
    pub cost: f64,
    /// 在庫数
    pub count: i64,
    pub comment: String,
    pub is_promotion: bool,
    pub promotion_description: String,
    /// 割り当て済みの特性値ID
    pub properties: Vec<Id>,
}

impl OwnItem {
    pub fn is_available(&self) -> bool {
        self.count > 0
    }
}

/// 競合他社
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: Id,
    pub name: String,
}

/// 競合品目（識別子は (competitor_id, code)）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorItem {
    pub id: Id,
    pub competitor_id: Option<Id>,
    pub code: String,
    pub name: String,
    pub category_id: Option<Id>,
    pub unit: String,
    pub properties: Vec<Id>,
}

/// 検索キーの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Name,
    Code,
    Both,
}

impl KeywordKind {
    /// テンプレートの記号（N/C/B）から変換
    pub fn from_sign(sign: &str) -> Option<Self> {
        match sign.trim().to_uppercase().as_str() {
            "N" => Some(KeywordKind::Name),
            "C" => Some(KeywordKind::Code),
            "B" => Some(KeywordKind::Both),
            _ => None,
        }
    }

    pub fn sign(&self) -> &'static str {
        match self {
            KeywordKind::Name => "N",
            KeywordKind::Code => "C",
            KeywordKind::Both => "B",
        }
    }
}

/// 検索キー（自社品目と競合品目の対応付け）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Id,
    pub text: String,
    pub own_item_id: Option<Id>,
    pub comp_item_id: Option<Id>,
    #[serde(default)]
    pub kind: Option<KeywordKind>,
    #[serde(default)]
    pub is_approved: bool,
}

/// カタログ件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub categories: usize,
    pub properties: usize,
    pub values: usize,
    pub models: usize,
    pub own_items: usize,
    pub competitors: usize,
    pub competitor_items: usize,
    pub keywords: usize,
}

/// カタログ全体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    categories: Vec<Category>,
    properties: Vec<CategoryProperty>,
    values: Vec<PropertyValue>,
    models: Vec<EquipmentModel>,
    own_items: Vec<OwnItem>,
    competitors: Vec<Competitor>,
    competitor_items: Vec<CompetitorItem>,
    keywords: Vec<Keyword>,
    next_id: Id,
}

impl Catalog {
    /// JSONファイルから読み込み（存在しなければ空のカタログ）
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let catalog: Self = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    /// JSONファイルに保存
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            categories: self.categories.len(),
            properties: self.properties.len(),
            values: self.values.len(),
            models: self.models.len(),
            own_items: self.own_items.len(),
            competitors: self.competitors.len(),
            competitor_items: self.competitor_items.len(),
            keywords: self.keywords.len(),
        }
    }

    // =============================================
    // 参照
    // =============================================

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn own_items(&self) -> &[OwnItem] {
        &self.own_items
    }

    pub fn competitor_items(&self) -> &[CompetitorItem] {
        &self.competitor_items
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    pub fn category(&self, id: Id) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn property(&self, id: Id) -> Option<&CategoryProperty> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn property_by_name(&self, category_id: Id, name: &str) -> Option<&CategoryProperty> {
        self.properties
            .iter()
            .find(|p| p.category_id == category_id && p.name == name)
    }

    /// カテゴリの特性一覧（名前順）
    pub fn properties_of(&self, category_id: Id) -> Vec<&CategoryProperty> {
        let mut props: Vec<_> = self
            .properties
            .iter()
            .filter(|p| p.category_id == category_id)
            .collect();
        props.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        props
    }

    /// カテゴリの特性数
    pub fn property_count(&self, category_id: Id) -> usize {
        self.properties
            .iter()
            .filter(|p| p.category_id == category_id)
            .count()
    }

    pub fn value(&self, id: Id) -> Option<&PropertyValue> {
        self.values.iter().find(|v| v.id == id)
    }

    /// 値が属するカテゴリ
    pub fn category_of_value(&self, value_id: Id) -> Option<Id> {
        self.value(value_id)
            .and_then(|v| self.property(v.property_id))
            .map(|p| p.category_id)
    }

    /// いずれかのトークンと完全一致する特性値（ID順）
    pub fn values_matching(&self, tokens: &[&str]) -> Vec<&PropertyValue> {
        self.values
            .iter()
            .filter(|v| tokens.iter().any(|t| *t == v.value))
            .collect()
    }

    /// 特性値IDを (特性名, 値) に展開
    pub fn describe_values(&self, value_ids: &[Id]) -> Vec<(&CategoryProperty, &PropertyValue)> {
        value_ids
            .iter()
            .filter_map(|id| self.value(*id))
            .filter_map(|v| self.property(v.property_id).map(|p| (p, v)))
            .collect()
    }

    pub fn model(&self, id: Id) -> Option<&EquipmentModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn competitor(&self, id: Id) -> Option<&Competitor> {
        self.competitors.iter().find(|c| c.id == id)
    }

    pub fn own_item(&self, id: Id) -> Option<&OwnItem> {
        self.own_items.iter().find(|i| i.id == id)
    }

    pub fn own_item_by_code(&self, code: &str) -> Option<&OwnItem> {
        self.own_items.iter().find(|i| i.code == code)
    }

    /// 照合対象の自社品目（除外ラインを除き、名前→品番順）
    pub fn eligible_own_items(&self, excluded_models: &[Id]) -> Vec<&OwnItem> {
        let mut items: Vec<_> = self
            .own_items
            .iter()
            .filter(|i| match i.model_id {
                Some(model) => !excluded_models.contains(&model),
                None => true,
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        items
    }

    /// 品番が一致する競合品目（名前順）
    pub fn competitor_items_with_code(&self, code: &str) -> Vec<&CompetitorItem> {
        self.sorted_competitor_items(|i| i.code == code)
    }

    /// 品名が一致する競合品目（名前順）
    pub fn competitor_items_with_name(&self, name: &str) -> Vec<&CompetitorItem> {
        self.sorted_competitor_items(|i| i.name == name)
    }

    fn sorted_competitor_items<F>(&self, pred: F) -> Vec<&CompetitorItem>
    where
        F: Fn(&CompetitorItem) -> bool,
    {
        let mut items: Vec<_> = self.competitor_items.iter().filter(|i| pred(i)).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        items
    }

    /// テキストが一致する検索キー
    pub fn keywords_with_text(&self, text: &str) -> Vec<&Keyword> {
        self.keywords.iter().filter(|k| k.text == text).collect()
    }

    /// 競合品目に紐づく検索キー（承認の有無を問わない）
    pub fn keywords_for_competitor_item(&self, comp_item_id: Id) -> Vec<&Keyword> {
        self.keywords
            .iter()
            .filter(|k| k.comp_item_id == Some(comp_item_id))
            .collect()
    }

    // =============================================
    // 更新（取込処理用）
    // =============================================

    fn issue_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    pub fn get_or_create_category(&mut self, name: &str) -> Id {
        if let Some(c) = self.category_by_name(name) {
            return c.id;
        }
        let id = self.issue_id();
        self.categories.push(Category { id, name: name.to_string() });
        id
    }

    pub fn get_or_create_property(&mut self, category_id: Id, name: &str) -> Id {
        if let Some(p) = self.property_by_name(category_id, name) {
            return p.id;
        }
        let id = self.issue_id();
        self.properties.push(CategoryProperty {
            id,
            category_id,
            name: name.to_string(),
        });
        id
    }

    pub fn get_or_create_value(&mut self, property_id: Id, value: &str) -> Id {
        if let Some(v) = self
            .values
            .iter()
            .find(|v| v.property_id == property_id && v.value == value)
        {
            return v.id;
        }
        let id = self.issue_id();
        self.values.push(PropertyValue {
            id,
            property_id,
            value: value.to_string(),
        });
        id
    }

    pub fn get_or_create_competitor(&mut self, name: &str) -> Id {
        if let Some(c) = self.competitors.iter().find(|c| c.name == name) {
            return c.id;
        }
        let id = self.issue_id();
        self.competitors.push(Competitor { id, name: name.to_string() });
        id
    }

    pub fn get_or_create_model(&mut self, category_id: Option<Id>, name: &str) -> Id {
        if let Some(m) = self
            .models
            .iter()
            .find(|m| m.category_id == category_id && m.name == name)
        {
            return m.id;
        }
        let id = self.issue_id();
        self.models.push(EquipmentModel {
            id,
            category_id,
            name: name.to_string(),
        });
        id
    }

    /// 品番をキーに自社品目を追加・更新（特性は既存を引き継ぐ）
    pub fn upsert_own_item(&mut self, mut item: OwnItem) -> Id {
        if let Some(existing) = self.own_items.iter_mut().find(|i| i.code == item.code) {
            item.id = existing.id;
            if item.properties.is_empty() {
                item.properties = std::mem::take(&mut existing.properties);
            }
            *existing = item;
            return existing.id;
        }
        item.id = self.issue_id();
        let id = item.id;
        self.own_items.push(item);
        id
    }

    /// (競合, 品番) をキーに競合品目を追加・更新
    pub fn upsert_competitor_item(&mut self, mut item: CompetitorItem) -> Id {
        if let Some(existing) = self
            .competitor_items
            .iter_mut()
            .find(|i| i.competitor_id == item.competitor_id && i.code == item.code)
        {
            item.id = existing.id;
            if item.properties.is_empty() {
                item.properties = std::mem::take(&mut existing.properties);
            }
            *existing = item;
            return existing.id;
        }
        item.id = self.issue_id();
        let id = item.id;
        self.competitor_items.push(item);
        id
    }

    /// 自社品目に特性値を追加（同じ値は重複させない）
    pub fn assign_own_item_value(&mut self, item_id: Id, value_id: Id) {
        if let Some(item) = self.own_items.iter_mut().find(|i| i.id == item_id) {
            if !item.properties.contains(&value_id) {
                item.properties.push(value_id);
            }
        }
    }

    /// 競合品目の特性値を設定（同じ特性の旧値は置き換え）
    pub fn assign_competitor_item_value(&mut self, item_id: Id, value_id: Id) {
        let Some(property_id) = self.value(value_id).map(|v| v.property_id) else {
            return;
        };
        let same_property: Vec<Id> = self
            .values
            .iter()
            .filter(|v| v.property_id == property_id)
            .map(|v| v.id)
            .collect();
        if let Some(item) = self.competitor_items.iter_mut().find(|i| i.id == item_id) {
            item.properties.retain(|v| !same_property.contains(v));
            item.properties.push(value_id);
        }
    }

    /// (テキスト, 自社品目, 競合品目) をキーに検索キーを追加・更新
    ///
    /// 取込で更新されたキーは未承認に戻る。
    pub fn upsert_keyword(
        &mut self,
        text: &str,
        own_item_id: Option<Id>,
        comp_item_id: Option<Id>,
        kind: Option<KeywordKind>,
    ) -> Id {
        if let Some(existing) = self.keywords.iter_mut().find(|k| {
            k.text == text && k.own_item_id == own_item_id && k.comp_item_id == comp_item_id
        }) {
            existing.kind = kind;
            existing.is_approved = false;
            return existing.id;
        }
        let id = self.issue_id();
        self.keywords.push(Keyword {
            id,
            text: text.to_string(),
            own_item_id,
            comp_item_id,
            kind,
            is_approved: false,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own(code: &str, name: &str) -> OwnItem {
        OwnItem {
            code: code.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut catalog = Catalog::default();
        let cat = catalog.get_or_create_category("Автоматы");
        assert_eq!(catalog.get_or_create_category("Автоматы"), cat);

        let prop = catalog.get_or_create_property(cat, "Ток");
        let value = catalog.get_or_create_value(prop, "16А");
        assert_eq!(catalog.get_or_create_value(prop, "16А"), value);
        assert_eq!(catalog.category_of_value(value), Some(cat));
        assert_eq!(catalog.summary().values, 1);
    }

    #[test]
    fn test_upsert_own_item_keeps_id_and_properties() {
        let mut catalog = Catalog::default();
        let id = catalog.upsert_own_item(own("A1", "Первый"));
        catalog.assign_own_item_value(id, 99);

        let again = catalog.upsert_own_item(own("A1", "Переименован"));
        assert_eq!(again, id);
        let item = catalog.own_item(id).unwrap();
        assert_eq!(item.name, "Переименован");
        assert_eq!(item.properties, vec![99]);
        assert_eq!(catalog.own_items().len(), 1);
    }

    #[test]
    fn test_eligible_items_exclude_models_and_sort_by_name() {
        let mut catalog = Catalog::default();
        let line = catalog.get_or_create_model(None, "KARAT");
        catalog.upsert_own_item(own("B2", "Бета"));
        catalog.upsert_own_item(own("A1", "Альфа"));
        catalog.upsert_own_item(OwnItem {
            model_id: Some(line),
            ..own("C3", "Альфа")
        });

        let all: Vec<_> = catalog.eligible_own_items(&[]).iter().map(|i| i.code.as_str()).collect();
        assert_eq!(all, vec!["A1", "C3", "B2"]);

        let filtered: Vec<_> = catalog
            .eligible_own_items(&[line])
            .iter()
            .map(|i| i.code.as_str())
            .collect();
        assert_eq!(filtered, vec!["A1", "B2"]);
    }

    #[test]
    fn test_competitor_value_replaces_same_property() {
        let mut catalog = Catalog::default();
        let cat = catalog.get_or_create_category("Кабель");
        let prop = catalog.get_or_create_property(cat, "Сечение");
        let v1 = catalog.get_or_create_value(prop, "1,5");
        let v2 = catalog.get_or_create_value(prop, "2,5");
        let item = catalog.upsert_competitor_item(CompetitorItem {
            code: "K-1".to_string(),
            ..Default::default()
        });

        catalog.assign_competitor_item_value(item, v1);
        catalog.assign_competitor_item_value(item, v2);
        assert_eq!(catalog.competitor_items()[0].properties, vec![v2]);
    }

    #[test]
    fn test_upsert_keyword_resets_approval() {
        let mut catalog = Catalog::default();
        let id = catalog.upsert_keyword("S201", Some(1), Some(2), Some(KeywordKind::Code));
        catalog.keywords[0].is_approved = true;

        let again = catalog.upsert_keyword("S201", Some(1), Some(2), Some(KeywordKind::Both));
        assert_eq!(again, id);
        assert!(!catalog.keywords()[0].is_approved);
        assert_eq!(catalog.keywords()[0].kind, Some(KeywordKind::Both));
    }

    #[test]
    fn test_catalog_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut catalog = Catalog::default();
        catalog.upsert_own_item(own("A1", "Альфа"));
        catalog.save(&path).unwrap();

        let loaded = Catalog::from_file(&path).unwrap();
        assert_eq!(loaded.own_items().len(), 1);
        assert_eq!(loaded.own_item_by_code("A1").map(|i| i.name.as_str()), Some("Альфа"));
    }

    #[test]
    fn test_keyword_kind_from_sign() {
        assert_eq!(KeywordKind::from_sign("n"), Some(KeywordKind::Name));
        assert_eq!(KeywordKind::from_sign(" C "), Some(KeywordKind::Code));
        assert_eq!(KeywordKind::from_sign("B"), Some(KeywordKind::Both));
        assert_eq!(KeywordKind::from_sign("X"), None);
    }
}
