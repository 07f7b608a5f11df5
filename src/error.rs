use thiserror::Error;

#[derive(Error, Debug)]
pub enum EquipMatchError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("アップロードデータが不正: {0}")]
    InvalidUploadData(String),

    #[error("複数カテゴリの特性列を含むため出力できません: {0}（--without-properties で特性列なしの出力が可能）")]
    MultiCategoryDownload(String),

    #[error("再計算可能な行数が不足しています: 要求 {requested} 行 / 残り {available} 行")]
    InsufficientQuota { requested: usize, available: usize },

    #[error("再計算が見つかりません: {0}")]
    RunNotFound(String),

    #[error("再計算は実行中ではありません: {0}")]
    RunNotActive(String),

    #[error("Excel読み込みエラー: {0}")]
    ExcelRead(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] equip_match_common::Error),
}

impl From<calamine::Error> for EquipMatchError {
    fn from(err: calamine::Error) -> Self {
        EquipMatchError::ExcelRead(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EquipMatchError>;
