//! equip-match
//!
//! 競合他社の見積行に対応する自社品目を照合し、再計算結果を帳票に出力する。
//! 照合エンジン本体は equip-match-common にある。

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod job;
pub mod logging;
pub mod progress;
pub mod store;

pub use equip_match_common as common;
