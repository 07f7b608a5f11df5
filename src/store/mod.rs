//! 再計算の実行記録
//!
//! Run（1回の再計算）と、その行ごとの結果（Result）を保持するストア。

mod json;
mod memory;

pub use json::JsonRunStore;
pub use memory::MemoryRunStore;

use crate::error::{EquipMatchError, Result};
use chrono::{DateTime, Local};
use equip_match_common::catalog::Id;
use equip_match_common::MatchTier;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run のライフサイクル
///
/// `Pending → Active → {Success | Error | Interrupted}`。終端状態からは遷移しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Active,
    Success,
    Error,
    Interrupted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Success | RunState::Error | RunState::Interrupted)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunState::Pending => "pending",
            RunState::Active => "active",
            RunState::Success => "success",
            RunState::Error => "error",
            RunState::Interrupted => "interrupted",
        };
        f.pad(label)
    }
}

/// 行の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Match,
    Unmatch,
    Skip,
}

/// 行数カウンタ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub skipped: usize,
}

impl RunCounters {
    pub fn new(total: usize) -> Self {
        Self { total, ..Default::default() }
    }

    pub fn processed(&self) -> usize {
        self.matched + self.unmatched + self.skipped
    }

    /// 1行分を加算した新しいカウンタ
    pub fn after(self, outcome: RowOutcome) -> Self {
        let mut next = self;
        match outcome {
            RowOutcome::Match => next.matched += 1,
            RowOutcome::Unmatch => next.unmatched += 1,
            RowOutcome::Skip => next.skipped += 1,
        }
        next
    }
}

/// 1回の再計算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationRun {
    pub id: Uuid,
    pub user: String,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    /// 特性類似度の閾値（%）
    pub psp: f64,
    pub excluded_models: Vec<Id>,
    pub state: RunState,
    pub counters: RunCounters,
    #[serde(default)]
    pub error_detail: String,
}

impl RecalculationRun {
    pub fn new(user: &str, psp: f64, excluded_models: Vec<Id>, total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            started_at: Local::now(),
            finished_at: None,
            psp,
            excluded_models,
            state: RunState::Pending,
            counters: RunCounters::new(total),
            error_detail: String::new(),
        }
    }

    pub fn activate(&mut self) -> Result<()> {
        if self.state != RunState::Pending {
            return Err(EquipMatchError::RunNotActive(self.id.to_string()));
        }
        self.state = RunState::Active;
        Ok(())
    }

    /// 終端状態へ遷移（1回のみ）
    pub fn finish(&mut self, state: RunState, detail: Option<String>) -> Result<()> {
        if self.state.is_terminal() || !state.is_terminal() {
            return Err(EquipMatchError::RunNotActive(self.id.to_string()));
        }
        self.state = state;
        self.finished_at = Some(Local::now());
        if let Some(detail) = detail {
            self.error_detail = detail;
        }
        Ok(())
    }
}

/// 行ごとの処理結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationResult {
    /// 入力行の位置（0始まり）
    pub position: usize,
    pub input_code: String,
    pub input_name: String,
    pub output_code: String,
    pub output_name: String,
    pub outcome: RowOutcome,
    pub tier: Option<MatchTier>,
    pub psp: Option<f64>,
}

pub trait RunStore: Send + Sync {
    fn create(&self, run: &RecalculationRun) -> Result<()>;

    fn load(&self, id: Uuid) -> Result<RecalculationRun>;

    /// 1行分の結果とカウンタを同時に記録
    fn record_row(&self, id: Uuid, result: &RecalculationResult, counters: RunCounters) -> Result<()>;

    /// 状態遷移を保存
    fn save_state(&self, run: &RecalculationRun) -> Result<()>;

    fn request_interrupt(&self, id: Uuid) -> Result<()>;

    /// 中断要求の有無（ストアから都度読む）
    fn is_interrupted(&self, id: Uuid) -> Result<bool>;

    /// 新しい順
    fn list(&self) -> Result<Vec<RecalculationRun>>;

    fn results(&self, id: Uuid) -> Result<Vec<RecalculationResult>>;
}

/// 終端済みの Run には行を追記しない
fn ensure_recordable(run: &RecalculationRun) -> Result<()> {
    if run.state.is_terminal() {
        return Err(EquipMatchError::RunNotActive(run.id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let counters = RunCounters::new(3)
            .after(RowOutcome::Match)
            .after(RowOutcome::Skip)
            .after(RowOutcome::Unmatch);
        assert_eq!(counters.processed(), 3);
        assert_eq!(counters.total, 3);
        assert_eq!((counters.matched, counters.unmatched, counters.skipped), (1, 1, 1));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut run = RecalculationRun::new("u@example.com", 80.0, vec![], 2);
        assert_eq!(run.state, RunState::Pending);

        run.activate().unwrap();
        assert!(run.activate().is_err());

        run.finish(RunState::Success, None).unwrap();
        assert!(run.finished_at.is_some());
        assert!(run.finish(RunState::Error, Some("late".into())).is_err());
        assert_eq!(run.state, RunState::Success);
        assert!(run.error_detail.is_empty());
    }

    #[test]
    fn test_finish_requires_terminal_state() {
        let mut run = RecalculationRun::new("u", 80.0, vec![], 0);
        assert!(run.finish(RunState::Active, None).is_err());
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_pending_can_fail_directly() {
        let mut run = RecalculationRun::new("u", 80.0, vec![], 5);
        run.finish(RunState::Error, Some("quota".into())).unwrap();
        assert_eq!(run.state, RunState::Error);
        assert_eq!(run.error_detail, "quota");
    }
}
