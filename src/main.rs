use clap::Parser;
use equip_match::{audit, cli, config, error, export, ingest, job, logging, progress, store};
use audit::{AuditAction, AuditEntry, AuditLog, TracingAuditLog, SECTION_CATALOG};
use chrono::Local;
use cli::{CatalogCommand, Cli, Commands, RunsCommand};
use config::Config;
use equip_match::common::{Catalog, EstimateRow};
use error::{EquipMatchError, Result};
use job::{RecalcRequest, Recalculator};
use progress::ConsoleProgress;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{JsonRunStore, RunState, RunStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;
    let config = Config::load()?;

    match cli.command {
        Commands::Prepare { input, output } => {
            println!("📄 equip-match - 見積読み込み\n");

            println!("[1/2] 見積を読み込み中...");
            let rows = ingest::read_estimate(&input)?;
            println!("✔ {}行を検出\n", rows.len());

            println!("[2/2] 結果を保存中...");
            let output = output.unwrap_or_else(|| {
                input
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join("rows.json")
            });
            let json = serde_json::to_string_pretty(&rows)?;
            std::fs::write(&output, json)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n✅ 完了");
        }

        Commands::Recalc { input, user, psp, exclude_model, output, rows_available } => {
            println!("🔎 equip-match - 再計算\n");

            println!("[1/3] 入力を読み込み中...");
            let rows = load_rows(&input)?;
            let catalog = Catalog::from_file(&config.catalog_path()?)?;
            println!("✔ {}行 / 自社品目 {}件\n", rows.len(), catalog.own_items().len());

            let request = RecalcRequest {
                initiator: user.unwrap_or_else(|| config.user_email.clone()),
                psp: psp.unwrap_or(config.default_psp),
                excluded_models: exclude_model,
                rows_available: rows_available.unwrap_or(config.rows_available),
            };

            println!("[2/3] 照合中... (閾値: {}%)", request.psp);
            let console = Arc::new(ConsoleProgress::new(rows.len()));
            let store: Arc<dyn RunStore> = Arc::new(JsonRunStore::open(config.runs_dir()?)?);
            let recalculator = Arc::new(Recalculator::new(
                Arc::new(catalog),
                store,
                console.clone(),
                Arc::new(TracingAuditLog),
            ));

            let handle = recalculator.start(rows, &request)?;
            let run_id = handle.run_id;
            println!("  再計算ID: {}", run_id);

            let wait = handle.wait();
            tokio::pin!(wait);
            let outcome = tokio::select! {
                outcome = &mut wait => outcome,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n- 中断を要求しています...");
                    if let Err(e) = recalculator.interrupt(run_id) {
                        tracing::warn!(error = %e, "中断要求に失敗");
                    }
                    wait.await
                }
            };
            console.finish();
            let outcome = outcome?;

            let counters = outcome.run.counters;
            println!(
                "✔ 一致 {} / 不一致 {} / スキップ {}\n",
                counters.matched, counters.unmatched, counters.skipped
            );

            println!("[3/3] 帳票を出力中...");
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            let path = export::write_report(&outcome.rows, &config.branding, &output, &request.initiator)?;
            println!("✔ 帳票出力: {}", path.display());

            if outcome.run.state == RunState::Interrupted {
                println!("\n⚠ 中断されました（処理済み {}行）", counters.processed());
            } else {
                println!("\n✅ 再計算完了");
            }
        }

        Commands::Catalog { action } => {
            let catalog_path = config.catalog_path()?;
            let mut catalog = Catalog::from_file(&catalog_path)?;

            match action {
                CatalogCommand::Upload { kind, file } => {
                    println!("📥 equip-match - カタログ取込 ({})\n", kind);
                    let report = ingest::upload(&mut catalog, kind, &file)?;
                    catalog.save(&catalog_path)?;
                    TracingAuditLog.record(AuditEntry::new(
                        SECTION_CATALOG,
                        AuditAction::UploadCatalog,
                        &config.user_email,
                        format!("{}: valid {}, invalid {}", kind, report.valid, report.invalid),
                    ));
                    println!("✔ 取込 {}行 / 無効 {}行", report.valid, report.invalid);
                    println!("\n✅ 完了");
                }

                CatalogCommand::Export { kind, output, without_properties } => {
                    println!("📤 equip-match - データファイル出力 ({})\n", kind);
                    let file_name = export::datafile_name(kind, Local::now());
                    let path = match output {
                        Some(p) if p.is_dir() || p.extension().is_none() => p.join(file_name),
                        Some(p) => p,
                        None => PathBuf::from(file_name),
                    };
                    export::write_datafile(&catalog, kind, without_properties, &path)?;
                    println!("✔ 出力: {}", path.display());
                }

                CatalogCommand::Info => {
                    let summary = catalog.summary();
                    println!("カタログ情報:");
                    println!("  パス: {}", catalog_path.display());
                    println!("  カテゴリ: {}", summary.categories);
                    println!("  特性: {} / 値: {}", summary.properties, summary.values);
                    println!("  製品ライン: {}", summary.models);
                    println!("  自社品目: {}", summary.own_items);
                    println!("  競合: {} / 競合品目: {}", summary.competitors, summary.competitor_items);
                    println!("  検索キー: {}", summary.keywords);
                }
            }
        }

        Commands::Runs { action } => {
            let store = JsonRunStore::open(config.runs_dir()?)?;

            match action {
                RunsCommand::List => {
                    let runs = store.list()?;
                    if runs.is_empty() {
                        println!("再計算の履歴はありません");
                    }
                    for run in runs {
                        println!(
                            "{}  {}  {:<11}  {}/{}  {}",
                            run.id,
                            run.started_at.format("%Y-%m-%d %H:%M:%S"),
                            run.state,
                            run.counters.processed(),
                            run.counters.total,
                            run.user
                        );
                    }
                }

                RunsCommand::Status { id } => {
                    let run = store.load(id)?;
                    println!("再計算: {}", run.id);
                    println!("  依頼者: {}", run.user);
                    println!("  状態: {}", run.state);
                    println!("  開始: {}", run.started_at.format("%Y-%m-%d %H:%M:%S"));
                    if let Some(end) = run.finished_at {
                        println!("  終了: {}", end.format("%Y-%m-%d %H:%M:%S"));
                    }
                    println!("  閾値: {}%", run.psp);
                    println!(
                        "  行数: {} (一致 {} / 不一致 {} / スキップ {})",
                        run.counters.total, run.counters.matched, run.counters.unmatched, run.counters.skipped
                    );
                    if !run.error_detail.is_empty() {
                        println!("  エラー: {}", run.error_detail);
                    }
                }

                RunsCommand::Interrupt { id } => {
                    let run = store.load(id)?;
                    if run.state.is_terminal() {
                        return Err(EquipMatchError::RunNotActive(id.to_string()));
                    }
                    store.request_interrupt(id)?;
                    println!("✔ 中断を要求しました: {}", id);
                }
            }
        }

        Commands::Config { show, set_psp, set_rows_available, set_user_email, set_data_dir } => {
            let mut config = config;
            let mut changed = false;

            if let Some(psp) = set_psp {
                config.set_psp(psp)?;
                changed = true;
                println!("✔ 閾値を設定しました: {}%", psp);
            }
            if let Some(rows) = set_rows_available {
                config.rows_available = rows;
                changed = true;
                println!("✔ 再計算可能な行数を設定しました: {}", rows);
            }
            if let Some(email) = set_user_email {
                config.user_email = email;
                changed = true;
                println!("✔ メールアドレスを設定しました");
            }
            if let Some(dir) = set_data_dir {
                config.data_dir = Some(dir);
                changed = true;
                println!("✔ データディレクトリを設定しました");
            }
            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("設定:");
                println!("  データディレクトリ: {}", config.data_dir()?.display());
                println!("  閾値: {}%", config.default_psp);
                println!("  再計算可能な行数: {}", config.rows_available);
                println!("  メールアドレス: {}", config.user_email);
            }
        }
    }

    Ok(())
}

/// 見積Excelまたは行JSONを読み込む
fn load_rows(input: &Path) -> Result<Vec<EstimateRow>> {
    if !input.exists() {
        return Err(EquipMatchError::FileNotFound(input.display().to_string()));
    }
    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        let content = std::fs::read_to_string(input)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        ingest::read_estimate(input)
    }
}
