use crate::error::{EquipMatchError, Result};
use equip_match_common::Branding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// データディレクトリの環境変数（設定ファイルより優先）
pub const DATA_DIR_ENV: &str = "EQUIP_MATCH_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// カタログ・再計算履歴の保存先
    pub data_dir: Option<PathBuf>,
    /// 特性類似度の閾値（%）
    pub default_psp: f64,
    /// 再計算可能な残り行数
    pub rows_available: usize,
    pub user_email: String,
    pub branding: Branding,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EquipMatchError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("equip-match").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            data_dir: None,
            default_psp: 80.0,
            rows_available: 1000,
            user_email: "anonymous@localhost".into(),
            branding: Branding::default(),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        // 環境変数を優先
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        let home = dirs::home_dir()
            .ok_or_else(|| EquipMatchError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".local").join("share").join("equip-match"))
    }

    pub fn catalog_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("catalog.json"))
    }

    pub fn runs_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("runs"))
    }

    pub fn set_psp(&mut self, psp: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&psp) {
            return Err(EquipMatchError::Config(format!(
                "閾値は0〜100の範囲で指定してください: {}",
                psp
            )));
        }
        self.default_psp = psp;
        Ok(())
    }
}
