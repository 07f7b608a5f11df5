//! 監査ログ
//!
//! 再計算・カタログ取込の各イベントを記録する。
//! 既定の実装は `audit` ターゲットの tracing イベントとして出力する。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub const SECTION_RECALCULATION: &str = "recalculation";
pub const SECTION_CATALOG: &str = "catalog";

/// 監査アクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    RequestToRecalculate,
    SuccessRecalculateRow,
    FailedRecalculateRow,
    SkipRecalculateRow,
    RecalculateInterrupted,
    RecalculateError,
    RecalculateFinished,
    UploadCatalog,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RequestToRecalculate => "request-to-recalculate",
            AuditAction::SuccessRecalculateRow => "success-recalculate-row",
            AuditAction::FailedRecalculateRow => "failed-recalculate-row",
            AuditAction::SkipRecalculateRow => "skip-recalculate-row",
            AuditAction::RecalculateInterrupted => "recalculate-interrupted",
            AuditAction::RecalculateError => "recalculate-error",
            AuditAction::RecalculateFinished => "recalculate-finished",
            AuditAction::UploadCatalog => "upload-catalog",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub section: String,
    pub action: AuditAction,
    pub message: String,
    pub user: String,
    pub is_error: bool,
    pub at: DateTime<Local>,
}

impl AuditEntry {
    pub fn new(section: &str, action: AuditAction, user: &str, message: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            action,
            message: message.into(),
            user: user.to_string(),
            is_error: false,
            at: Local::now(),
        }
    }

    pub fn error(mut self) -> Self {
        self.is_error = true;
        self
    }
}

pub trait AuditLog: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// tracing へ出力する監査ログ
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, entry: AuditEntry) {
        if entry.is_error {
            tracing::error!(
                target: "audit",
                section = %entry.section,
                action = %entry.action,
                user = %entry.user,
                "{}",
                entry.message
            );
        } else {
            tracing::info!(
                target: "audit",
                section = %entry.section,
                action = %entry.action,
                user = %entry.user,
                "{}",
                entry.message
            );
        }
    }
}

/// メモリ上に保持する監査ログ（テスト用）
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.entries().iter().map(|e| e.action).collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}
