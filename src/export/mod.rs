pub mod datafile;

pub use datafile::{datafile_buffer, datafile_name, write_datafile};

use crate::error::{EquipMatchError, Result};
use chrono::{DateTime, Local};
use equip_match_common::export::generate_report_buffer;
use equip_match_common::{Branding, EstimateRow};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9@._-]").unwrap();
}

/// ファイル名に使えない文字を置き換える
pub fn sanitize_for_file_name(text: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(text.trim(), "_").into_owned()
}

/// 帳票ファイル名: recalculation_<email>_<YYYY-MM-DD_HH-MM-SS>.xlsx
pub fn report_file_name(email: &str, at: DateTime<Local>) -> String {
    format!(
        "recalculation_{}_{}.xlsx",
        sanitize_for_file_name(email),
        at.format("%Y-%m-%d_%H-%M-%S")
    )
}

fn output_path_for_report(output: &Path, email: &str) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(report_file_name(email, Local::now()))
    } else {
        output.to_path_buf()
    }
}

/// 再計算結果の帳票を書き出す
///
/// `output` がディレクトリ（または拡張子なし）の場合は規定のファイル名で保存する。
pub fn write_report(
    rows: &[EstimateRow],
    branding: &Branding,
    output: &Path,
    email: &str,
) -> Result<PathBuf> {
    let path = output_path_for_report(output, email);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let buffer = generate_report_buffer(rows, branding).map_err(EquipMatchError::ExcelGeneration)?;
    std::fs::write(&path, buffer)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "帳票を出力");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            report_file_name("buyer@example.com", at),
            "recalculation_buyer@example.com_2024-03-05_14-07-09.xlsx"
        );
    }

    #[test]
    fn test_sanitize_for_file_name() {
        assert_eq!(sanitize_for_file_name("a b/c@d.ru"), "a_b_c@d.ru");
    }

    #[test]
    fn test_write_report_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&[], &Branding::default(), dir.path(), "u@x.ru").unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("recalculation_u@x.ru_"));
        assert!(name.ends_with(".xlsx"));
    }
}
