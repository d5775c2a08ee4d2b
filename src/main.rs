use clap::Parser;
use order_hold::config::Command;
use order_hold::core::retention::sweep_logs;
use order_hold::utils::error::{ErrorSeverity, HoldError};
use order_hold::utils::{logger, validation::Validate};
use order_hold::{CliConfig, HoldConfig, HoldEngine, LocalStorage, OrderPipeline};
use std::path::Path;
use std::time::SystemTime;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting order-hold");
    if let Some(path) = &cli.config {
        tracing::info!("📁 Loading configuration from: {}", path);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }
    tracing::debug!("Config: {:?}", config);

    let result = match &cli.command {
        Command::Process { dry_run, .. } => process(config, *dry_run).await,
        Command::SweepLogs { .. } => sweep(&config).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        exit_with(&e);
    }

    Ok(())
}

async fn process(config: HoldConfig, dry_run: bool) -> order_hold::Result<()> {
    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - files will not be rewritten or moved");
    }

    let report_dir = config.paths.report_dir.clone();
    let report_storage = LocalStorage::new(report_dir.clone());
    let report_config = config.report.clone();
    let storage = LocalStorage::new(config.paths.input_dir.clone());
    let pipeline = OrderPipeline::new(storage, config);

    let engine = HoldEngine::new(pipeline, report_storage, report_config).with_dry_run(dry_run);
    let summary = engine.run().await?;

    println!(
        "✅ Processed {} files: {} held, {} with errors",
        summary.files, summary.held, summary.errors
    );
    if let Some(name) = &summary.report_file {
        println!("📁 Report saved to: {}", Path::new(&report_dir).join(name).display());
    }
    Ok(())
}

async fn sweep(config: &HoldConfig) -> order_hold::Result<()> {
    let summary = sweep_logs(
        &config.retention.log_dir,
        config.retention.max_age_days,
        SystemTime::now(),
    )
    .await?;

    println!(
        "🧹 Deleted {} of {} files older than {} days from {}",
        summary.deleted.len(),
        summary.scanned,
        config.retention.max_age_days,
        config.retention.log_dir
    );
    if summary.failed > 0 {
        eprintln!("⚠️ {} files could not be removed", summary.failed);
    }
    Ok(())
}

fn exit_with(e: &HoldError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
