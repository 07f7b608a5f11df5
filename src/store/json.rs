//! JSONファイルによるストア
//!
//! `<dir>/<run-id>.json` に Run（状態とカウンタ）を、
//! `<dir>/<run-id>.results.jsonl` に行ごとの結果を1行1件で追記し、
//! `<dir>/<run-id>.interrupt` に中断要求を保存する。中断要求を別ファイルにすることで、
//! 別プロセスからの中断がジョブ自身の行書き込みで上書きされない。
//! 中断要求は Run が終端状態で保存された時点で削除する。

use super::{ensure_recordable, RecalculationResult, RecalculationRun, RunCounters, RunStore};
use crate::error::{EquipMatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const RUN_EXTENSION: &str = "json";
const RESULTS_EXTENSION: &str = "results.jsonl";
const INTERRUPT_EXTENSION: &str = "interrupt";

/// Run ファイルの構造（結果は別ファイル）
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunFile {
    /// バージョン（互換性チェック用）
    version: u32,
    run: RecalculationRun,
}

impl RunFile {
    const CURRENT_VERSION: u32 = 2;

    fn new(run: &RecalculationRun) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            run: run.clone(),
        }
    }
}

pub struct JsonRunStore {
    dir: PathBuf,
    // 同一プロセス内の読み書きを直列化
    lock: Mutex<()>,
}

impl JsonRunStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, lock: Mutex::new(()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RUN_EXTENSION))
    }

    fn results_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RESULTS_EXTENSION))
    }

    fn interrupt_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id, INTERRUPT_EXTENSION))
    }

    fn read(&self, id: Uuid) -> Result<RunFile> {
        let path = self.run_path(id);
        if !path.exists() {
            return Err(EquipMatchError::RunNotFound(id.to_string()));
        }
        read_file(&path)
    }

    /// 一時ファイルに書いてから置き換える
    fn write(&self, file: &RunFile) -> Result<()> {
        let path = self.run_path(file.run.id);
        let tmp = path.with_extension("json.tmp");
        {
            let writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(writer, file)?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// 結果を1行追記
    fn append_result(&self, id: Uuid, result: &RecalculationResult) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.results_path(id))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn clear_interrupt(&self, id: Uuid) -> Result<()> {
        match std::fs::remove_file(self.interrupt_path(id)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| EquipMatchError::Io(std::io::Error::other("ストアのロックが破損しています")))
    }
}

fn read_file(path: &Path) -> Result<RunFile> {
    let reader = BufReader::new(File::open(path)?);
    let file: RunFile = serde_json::from_reader(reader)?;
    if file.version != RunFile::CURRENT_VERSION {
        return Err(EquipMatchError::Config(format!(
            "再計算ファイルのバージョン不一致: {} ({})",
            path.display(),
            file.version
        )));
    }
    Ok(file)
}

impl RunStore for JsonRunStore {
    fn create(&self, run: &RecalculationRun) -> Result<()> {
        let _guard = self.guard()?;
        File::create(self.results_path(run.id))?;
        self.write(&RunFile::new(run))
    }

    fn load(&self, id: Uuid) -> Result<RecalculationRun> {
        let _guard = self.guard()?;
        Ok(self.read(id)?.run)
    }

    fn record_row(&self, id: Uuid, result: &RecalculationResult, counters: RunCounters) -> Result<()> {
        let _guard = self.guard()?;
        let mut file = self.read(id)?;
        ensure_recordable(&file.run)?;
        self.append_result(id, result)?;
        file.run.counters = counters;
        self.write(&file)
    }

    fn save_state(&self, run: &RecalculationRun) -> Result<()> {
        let _guard = self.guard()?;
        let mut file = self.read(run.id)?;
        file.run = run.clone();
        self.write(&file)?;
        if run.state.is_terminal() {
            self.clear_interrupt(run.id)?;
        }
        Ok(())
    }

    fn request_interrupt(&self, id: Uuid) -> Result<()> {
        let _guard = self.guard()?;
        if !self.run_path(id).exists() {
            return Err(EquipMatchError::RunNotFound(id.to_string()));
        }
        std::fs::write(self.interrupt_path(id), b"")?;
        Ok(())
    }

    fn is_interrupted(&self, id: Uuid) -> Result<bool> {
        Ok(self.interrupt_path(id).exists())
    }

    fn list(&self) -> Result<Vec<RecalculationRun>> {
        let _guard = self.guard()?;
        let mut runs = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RUN_EXTENSION) {
                continue;
            }
            match read_file(&path) {
                Ok(file) => runs.push(file.run),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "再計算ファイルを読み飛ばします"),
            }
        }
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    fn results(&self, id: Uuid) -> Result<Vec<RecalculationResult>> {
        let _guard = self.guard()?;
        if !self.run_path(id).exists() {
            return Err(EquipMatchError::RunNotFound(id.to_string()));
        }
        let path = self.results_path(id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        for line in BufReader::new(File::open(&path)?).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            results.push(serde_json::from_str(&line)?);
        }
        Ok(results)
    }
}
