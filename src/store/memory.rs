use super::{ensure_recordable, RecalculationResult, RecalculationRun, RunCounters, RunStore};
use crate::error::{EquipMatchError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    runs: HashMap<Uuid, RecalculationRun>,
    results: HashMap<Uuid, Vec<RecalculationResult>>,
}

/// メモリ上のストア
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    inner: Mutex<Inner>,
    // 行の書き込みとは別に保持する
    interrupts: Mutex<HashSet<Uuid>>,
}

fn poisoned() -> EquipMatchError {
    EquipMatchError::Io(std::io::Error::other("ストアのロックが破損しています"))
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| poisoned())
    }
}

impl RunStore for MemoryRunStore {
    fn create(&self, run: &RecalculationRun) -> Result<()> {
        let mut inner = self.inner()?;
        inner.runs.insert(run.id, run.clone());
        inner.results.insert(run.id, Vec::new());
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<RecalculationRun> {
        self.inner()?
            .runs
            .get(&id)
            .cloned()
            .ok_or_else(|| EquipMatchError::RunNotFound(id.to_string()))
    }

    fn record_row(&self, id: Uuid, result: &RecalculationResult, counters: RunCounters) -> Result<()> {
        let mut inner = self.inner()?;
        let run = inner
            .runs
            .get_mut(&id)
            .ok_or_else(|| EquipMatchError::RunNotFound(id.to_string()))?;
        ensure_recordable(run)?;
        run.counters = counters;
        inner.results.entry(id).or_default().push(result.clone());
        Ok(())
    }

    fn save_state(&self, run: &RecalculationRun) -> Result<()> {
        let mut inner = self.inner()?;
        if !inner.runs.contains_key(&run.id) {
            return Err(EquipMatchError::RunNotFound(run.id.to_string()));
        }
        inner.runs.insert(run.id, run.clone());
        if run.state.is_terminal() {
            self.interrupts.lock().map_err(|_| poisoned())?.remove(&run.id);
        }
        Ok(())
    }

    fn request_interrupt(&self, id: Uuid) -> Result<()> {
        if !self.inner()?.runs.contains_key(&id) {
            return Err(EquipMatchError::RunNotFound(id.to_string()));
        }
        self.interrupts.lock().map_err(|_| poisoned())?.insert(id);
        Ok(())
    }

    fn is_interrupted(&self, id: Uuid) -> Result<bool> {
        Ok(self.interrupts.lock().map_err(|_| poisoned())?.contains(&id))
    }

    fn list(&self) -> Result<Vec<RecalculationRun>> {
        let mut runs: Vec<_> = self.inner()?.runs.values().cloned().collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    fn results(&self, id: Uuid) -> Result<Vec<RecalculationResult>> {
        self.inner()?
            .results
            .get(&id)
            .cloned()
            .ok_or_else(|| EquipMatchError::RunNotFound(id.to_string()))
    }
}
