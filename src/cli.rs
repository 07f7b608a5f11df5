use crate::ingest::UploadKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "equip-match")]
#[command(about = "競合見積の自社品目照合・再計算ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 見積Excelを再計算用の行JSONに変換
    Prepare {
        /// 見積ファイル（.xlsx）
        #[arg(required = true)]
        input: PathBuf,

        /// 出力JSONファイル（デフォルト: 入力と同じ場所の rows.json）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 再計算を実行して帳票を出力
    Recalc {
        /// 見積ファイル（.xlsx）または prepare で出力した行JSON
        #[arg(required = true)]
        input: PathBuf,

        /// 依頼者のメールアドレス（デフォルト: 設定値）
        #[arg(short, long)]
        user: Option<String>,

        /// 特性類似度の閾値（%、デフォルト: 設定値）
        #[arg(long)]
        psp: Option<f64>,

        /// 照合対象から除外する製品ラインID（複数指定可）
        #[arg(long = "exclude-model")]
        exclude_model: Vec<u64>,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 再計算可能な行数（デフォルト: 設定値）
        #[arg(long)]
        rows_available: Option<usize>,
    },

    /// カタログ管理
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },

    /// 再計算の履歴・制御
    Runs {
        #[command(subcommand)]
        action: RunsCommand,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 特性類似度の閾値（%）を設定
        #[arg(long)]
        set_psp: Option<f64>,

        /// 再計算可能な行数を設定
        #[arg(long)]
        set_rows_available: Option<usize>,

        /// 依頼者のメールアドレスを設定
        #[arg(long)]
        set_user_email: Option<String>,

        /// データディレクトリを設定
        #[arg(long)]
        set_data_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// テンプレートを取込 (own/competitor/keywords/categories)
    Upload {
        #[arg(required = true)]
        kind: UploadKind,

        #[arg(required = true)]
        file: PathBuf,
    },

    /// データファイルを出力 (own/competitor/keywords/categories)
    Export {
        #[arg(required = true)]
        kind: UploadKind,

        /// 出力ファイル/ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 特性列なしで出力（複数カテゴリを1ファイルに出力できる）
        #[arg(long)]
        without_properties: bool,
    },

    /// カタログの件数を表示
    Info,
}

#[derive(Subcommand)]
pub enum RunsCommand {
    /// 再計算の一覧
    List,

    /// 再計算の状態
    Status {
        #[arg(required = true)]
        id: Uuid,
    },

    /// 実行中の再計算を中断
    Interrupt {
        #[arg(required = true)]
        id: Uuid,
    },
}
