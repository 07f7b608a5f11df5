//! 再計算ジョブ
//!
//! 見積行を入力順に1行ずつ照合し、行ごとに結果の記録・進捗配信・監査ログを行う。
//! 各行の前にストアから中断要求を読み直し、要求があればその行を処理せずに終了する。

use crate::audit::{AuditAction, AuditEntry, AuditLog, SECTION_RECALCULATION};
use crate::error::{EquipMatchError, Result};
use crate::progress::{ProgressChannel, ProgressMessage};
use crate::store::{RecalculationResult, RecalculationRun, RowOutcome, RunState, RunStore};
use equip_match_common::catalog::Id;
use equip_match_common::{resolve, Catalog, EligibleItems, EstimateRow, RowQuery};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// 再計算の依頼内容
#[derive(Debug, Clone)]
pub struct RecalcRequest {
    pub initiator: String,
    /// 特性類似度の閾値（%）
    pub psp: f64,
    pub excluded_models: Vec<Id>,
    /// 依頼者が再計算できる残り行数
    pub rows_available: usize,
}

/// ジョブの結果
#[derive(Debug, Clone)]
pub struct RecalcOutcome {
    pub run: RecalculationRun,
    /// 処理済みの行（入力順、中断時は処理済み分のみ）
    pub rows: Vec<EstimateRow>,
}

/// バックグラウンド実行中のジョブ
pub struct RunHandle {
    pub run_id: Uuid,
    join: JoinHandle<Result<RecalcOutcome>>,
}

impl RunHandle {
    pub async fn wait(self) -> Result<RecalcOutcome> {
        self.join
            .await
            .map_err(|e| EquipMatchError::Io(std::io::Error::other(format!("ジョブ実行エラー: {}", e))))?
    }
}

/// 1行分の処理結果
struct RowStep {
    result: RecalculationResult,
    log: String,
    audit: AuditEntry,
}

pub struct Recalculator {
    catalog: Arc<Catalog>,
    store: Arc<dyn RunStore>,
    progress: Arc<dyn ProgressChannel>,
    audit: Arc<dyn AuditLog>,
}

impl Recalculator {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn RunStore>,
        progress: Arc<dyn ProgressChannel>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self { catalog, store, progress, audit }
    }

    /// 同期実行
    pub fn execute(&self, rows: Vec<EstimateRow>, request: &RecalcRequest) -> Result<RecalcOutcome> {
        let run = self.prepare(&rows, request)?;
        self.run_job(run, rows)
    }

    /// blocking タスクで実行し、Run ID をすぐに返す
    pub fn start(self: &Arc<Self>, rows: Vec<EstimateRow>, request: &RecalcRequest) -> Result<RunHandle> {
        let run = self.prepare(&rows, request)?;
        let run_id = run.id;
        let this = Arc::clone(self);
        let join = tokio::task::spawn_blocking(move || this.run_job(run, rows));
        Ok(RunHandle { run_id, join })
    }

    /// 中断を要求（次の行の前に反映される）
    pub fn interrupt(&self, run_id: Uuid) -> Result<()> {
        let run = self.store.load(run_id)?;
        if run.state.is_terminal() {
            return Err(EquipMatchError::RunNotActive(run_id.to_string()));
        }
        self.store.request_interrupt(run_id)?;
        tracing::info!(run = %run_id, "中断を要求しました");
        Ok(())
    }

    pub fn status(&self, run_id: Uuid) -> Result<RecalculationRun> {
        self.store.load(run_id)
    }

    /// Run を作成し、行数の上限を確認する
    fn prepare(&self, rows: &[EstimateRow], request: &RecalcRequest) -> Result<RecalculationRun> {
        let mut run = RecalculationRun::new(
            &request.initiator,
            request.psp,
            request.excluded_models.clone(),
            rows.len(),
        );
        self.store.create(&run)?;
        self.audit.record(AuditEntry::new(
            SECTION_RECALCULATION,
            AuditAction::RequestToRecalculate,
            &run.user,
            format!("Запрос на пересчет. Пользователь: {}; строк: {}", run.user, rows.len()),
        ));

        if request.rows_available < rows.len() {
            let err = EquipMatchError::InsufficientQuota {
                requested: rows.len(),
                available: request.rows_available,
            };
            self.fail(&mut run, &err);
            return Err(err);
        }
        Ok(run)
    }

    fn run_job(&self, mut run: RecalculationRun, rows: Vec<EstimateRow>) -> Result<RecalcOutcome> {
        match self.process(&mut run, rows) {
            Ok(rows) => Ok(RecalcOutcome { run, rows }),
            Err(err) => {
                self.fail(&mut run, &err);
                Err(err)
            }
        }
    }

    /// Run を error で終了し、監査ログに残す
    fn fail(&self, run: &mut RecalculationRun, err: &EquipMatchError) {
        let detail = err.to_string();
        tracing::error!(run = %run.id, error = %detail, "再計算エラー");
        if run.finish(RunState::Error, Some(detail.clone())).is_ok() {
            if let Err(e) = self.store.save_state(run) {
                tracing::error!(run = %run.id, error = %e, "エラー状態を保存できません");
            }
        }
        self.audit.record(
            AuditEntry::new(SECTION_RECALCULATION, AuditAction::RecalculateError, &run.user, detail).error(),
        );
    }

    /// 終端状態の保存に成功してから手元の Run に反映する
    fn finalize(&self, run: &mut RecalculationRun, state: RunState) -> Result<()> {
        let mut next = run.clone();
        next.finish(state, None)?;
        self.store.save_state(&next)?;
        *run = next;
        Ok(())
    }

    fn process(&self, run: &mut RecalculationRun, rows: Vec<EstimateRow>) -> Result<Vec<EstimateRow>> {
        run.activate()?;
        self.store.save_state(run)?;
        tracing::info!(run = %run.id, user = %run.user, rows = rows.len(), psp = run.psp, "再計算を開始");

        let eligible = EligibleItems::new(&self.catalog, &run.excluded_models);
        let mut counters = run.counters;
        let mut output = Vec::with_capacity(rows.len());

        for (position, mut row) in rows.into_iter().enumerate() {
            if self.store.is_interrupted(run.id)? {
                run.counters = counters;
                self.finalize(run, RunState::Interrupted)?;
                tracing::info!(run = %run.id, processed = counters.processed(), "再計算を中断");
                self.progress.push(&run.user, &ProgressMessage::new("Пересчет прерван", &counters));
                self.audit.record(AuditEntry::new(
                    SECTION_RECALCULATION,
                    AuditAction::RecalculateInterrupted,
                    &run.user,
                    format!("Пересчет прерван. Обработано строк: {}", counters.processed()),
                ));
                return Ok(output);
            }

            let step = self.step(&eligible, run, position, &mut row);
            counters = counters.after(step.result.outcome);
            self.store.record_row(run.id, &step.result, counters)?;
            run.counters = counters;

            self.progress.push(&run.user, &ProgressMessage::new(step.log, &counters));
            self.audit.record(step.audit);
            output.push(row);
        }

        self.finalize(run, RunState::Success)?;
        tracing::info!(
            run = %run.id,
            matched = counters.matched,
            unmatched = counters.unmatched,
            skipped = counters.skipped,
            "再計算が完了"
        );
        self.audit.record(AuditEntry::new(
            SECTION_RECALCULATION,
            AuditAction::RecalculateFinished,
            &run.user,
            format!(
                "Пересчет завершен. Найдено: {}; не найдено: {}; пропущено: {}",
                counters.matched, counters.unmatched, counters.skipped
            ),
        ));
        Ok(output)
    }

    /// 1行を照合し、一致した場合は行を上書きする
    fn step(
        &self,
        eligible: &EligibleItems<'_>,
        run: &RecalculationRun,
        position: usize,
        row: &mut EstimateRow,
    ) -> RowStep {
        let mut result = RecalculationResult {
            position,
            input_code: row.comp_code.clone(),
            input_name: row.comp_name.clone(),
            output_code: row.our_code.clone(),
            output_name: row.our_name.clone(),
            outcome: RowOutcome::Skip,
            tier: None,
            psp: None,
        };

        // 単位も数量もない行は見出し扱い
        if row.is_decoration() {
            return RowStep {
                log: format!("Пропущено: {} {}", row.comp_code, row.comp_name),
                audit: AuditEntry::new(
                    SECTION_RECALCULATION,
                    AuditAction::SkipRecalculateRow,
                    &run.user,
                    format!("Строка {}: {}", position + 1, row.comp_code),
                ),
                result,
            };
        }

        match resolve(eligible, &RowQuery::from_row(row), run.psp) {
            Some(found) => {
                row.apply_match(found.primary, &found.alternates, found.exact());
                tracing::debug!(
                    comp_code = %result.input_code,
                    code = %found.primary.code,
                    tier = %found.tier,
                    "一致"
                );
                result.output_code = found.primary.code.clone();
                result.output_name = found.primary.name.clone();
                result.outcome = RowOutcome::Match;
                result.tier = Some(found.tier);
                result.psp = found.psp;
                RowStep {
                    log: format!(
                        "Найдено: {} {} --> {} {}",
                        result.input_code, result.input_name, result.output_code, result.output_name
                    ),
                    audit: AuditEntry::new(
                        SECTION_RECALCULATION,
                        AuditAction::SuccessRecalculateRow,
                        &run.user,
                        format!("Артикул: {} -> {}", result.input_code, result.output_code),
                    ),
                    result,
                }
            }
            None => {
                result.outcome = RowOutcome::Unmatch;
                RowStep {
                    log: format!("Не найдено: {} {}", result.input_code, result.input_name),
                    audit: AuditEntry::new(
                        SECTION_RECALCULATION,
                        AuditAction::FailedRecalculateRow,
                        &run.user,
                        format!("Артикул: {}; Наименование: {}", result.input_code, result.input_name),
                    ),
                    result,
                }
            }
        }
    }
}
