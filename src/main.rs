use anyhow::Context;
use clap::Parser;
use invoice_sync::utils::{logger, validation::Validate};
use invoice_sync::{
    CliConfig, CollectingErrorSink, InMemoryStore, LedgerFile, RunStatus, TomlConfig,
    TracingErrorSink, UpdateUserInvoices,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose, config.log_level());
    } else {
        logger::init_cli_logger(args.verbose, config.log_level());
    }

    tracing::info!("Starting update-user-invoices ({})", config.job.name);
    args.apply_overrides(&mut config);

    if let Err(e) = args.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let ledger = LedgerFile::new(config.store_path());
    let snapshot = ledger
        .load()
        .with_context(|| format!("failed to load ledger from {}", ledger.path().display()))?;
    tracing::info!(
        "📁 Loaded ledger: {} account(s), {} invoice(s)",
        snapshot.accounts.len(),
        snapshot.invoices.len()
    );

    let store = InMemoryStore::from_snapshot(snapshot);
    let anomalies = CollectingErrorSink::new();
    let job = UpdateUserInvoices::new(
        store.clone(),
        config,
        (TracingErrorSink, anomalies.clone()),
    );

    let summary = job.perform(args.year, args.month).await;

    if let RunStatus::Aborted(kind) = summary.status {
        eprintln!(
            "❌ Run aborted ({:?}, severity {:?}); nothing was reconciled",
            kind,
            kind.severity()
        );
        let exit_code = kind.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
        return Ok(());
    }

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - ledger not written");
    } else {
        ledger
            .write(&store.snapshot().await)
            .with_context(|| format!("failed to write ledger to {}", ledger.path().display()))?;
    }

    println!(
        "✅ Reconciled {} account(s): {} invoice(s) saved, {} destroyed, {} skipped, {} failed ({:?})",
        summary.accounts_processed,
        summary.invoices_saved,
        summary.invoices_destroyed,
        summary.accounts_skipped,
        summary.accounts_failed,
        summary.elapsed
    );
    let reported = anomalies.notifications().len();
    if reported > 0 {
        println!("⚠️  {} anomaly report(s) raised; see logs", reported);
    }

    // 有帳戶失敗時以可重試的退出碼結束
    if summary.accounts_failed > 0 {
        std::process::exit(2);
    }

    Ok(())
}
