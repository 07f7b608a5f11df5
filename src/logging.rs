use crate::error::{EquipMatchError, Result};
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// 既定のフィルタ（RUST_LOG 未設定時）
pub const DEFAULT_FILTER: &str = "equip_match=info,audit=info";

/// tracing の初期化（プロセスで1回）
pub fn init_tracing(verbose: bool) -> Result<()> {
    let fallback = if verbose {
        "equip_match=debug,equip_match_common=debug,audit=info"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| EquipMatchError::Config(format!("ログ初期化エラー: {}", e)))
}
