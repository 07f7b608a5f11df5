//! 進捗配信
//!
//! 1行処理するごとに `{log, rt}` を利用者ごとのトピックへ送る。
//! 配信はベストエフォートで、購読者がいなければ破棄する。

use crate::store::RunCounters;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// トピックあたりのバッファ
const TOPIC_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub log: String,
    /// 残り時間（"HHh MMm SSs"）
    pub rt: String,
    /// 処理済み行数（配信しない）
    #[serde(skip)]
    pub processed: usize,
}

impl ProgressMessage {
    pub fn new(log: impl Into<String>, counters: &RunCounters) -> Self {
        Self {
            log: log.into(),
            rt: remtime_str(remaining_seconds(counters)),
            processed: counters.processed(),
        }
    }
}

/// 利用者ごとのトピック名
pub fn topic(user: &str) -> String {
    format!("search-progress-{}", user)
}

/// 残り時間の見積り（秒）
///
/// 未一致行は照合コストが小さいため 0.1 行として数える。
pub fn remaining_seconds(counters: &RunCounters) -> u64 {
    let remaining = counters.total as f64
        - counters.matched as f64
        - counters.skipped as f64
        - counters.unmatched as f64 * 0.1;
    if remaining <= 0.0 {
        0
    } else {
        remaining as u64
    }
}

/// 秒数を "HHh MMm SSs" に整形
pub fn remtime_str(sec: u64) -> String {
    let h = sec / 3600;
    let m = (sec % 3600) / 60;
    let s = sec % 60;
    format!("{:02}h {:02}m {:02}s", h, m, s)
}

pub trait ProgressChannel: Send + Sync {
    fn push(&self, user: &str, message: &ProgressMessage);
}

/// 何もしないチャネル
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressChannel for NullProgress {
    fn push(&self, _user: &str, _message: &ProgressMessage) {}
}

/// トピックごとの broadcast チャネル
#[derive(Debug, Default)]
pub struct ProgressHub {
    topics: Mutex<HashMap<String, broadcast::Sender<ProgressMessage>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 利用者のトピックを購読
    pub fn subscribe(&self, user: &str) -> Option<broadcast::Receiver<ProgressMessage>> {
        let mut topics = self.topics.lock().ok()?;
        let sender = topics
            .entry(topic(user))
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0);
        Some(sender.subscribe())
    }
}

impl ProgressChannel for ProgressHub {
    fn push(&self, user: &str, message: &ProgressMessage) {
        let Ok(topics) = self.topics.lock() else {
            return;
        };
        if let Some(sender) = topics.get(&topic(user)) {
            // 購読者なしは送信エラーになるが無視する
            if sender.send(message.clone()).is_err() {
                tracing::trace!(topic = %topic(user), "購読者なし");
            }
        }
    }
}

/// CLI用のプログレスバー
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("  [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
            .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressChannel for ConsoleProgress {
    fn push(&self, _user: &str, message: &ProgressMessage) {
        self.bar.set_position(message.processed as u64);
        self.bar.set_message(format!("残り {} | {}", message.rt, message.log));
    }
}
