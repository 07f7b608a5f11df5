//! Equip Match Common Library
//!
//! マッチングエンジン本体（カタログ・類似度・照合カスケード・帳票レイアウト）

pub mod types;
pub mod catalog;
pub mod similarity;
pub mod resolver;
pub mod layout;
pub mod error;
#[cfg(feature = "excel")]
pub mod export;

pub use types::{Branding, EstimateRow, AVAILABLE_LABEL, UNAVAILABLE_LABEL};
pub use catalog::{Catalog, Category, CategoryProperty, Competitor, CompetitorItem, EquipmentModel, Keyword, KeywordKind, OwnItem, PropertyValue};
pub use similarity::{ItemScore, similar_items};
pub use resolver::{EligibleItems, MatchOutcome, MatchTier, RowQuery, resolve};
pub use layout::{ColumnGroup, ColumnSource, ReportColumn, REPORT_COLUMNS};
pub use error::{Error, Result};
