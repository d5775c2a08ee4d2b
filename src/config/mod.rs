pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use crate::config::toml_config::HoldConfig;
#[cfg(feature = "cli")]
use crate::utils::error::Result;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "order-hold")]
#[command(about = "Flags exported orders for manual review and sweeps old logs")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in rules are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Evaluate every order file in the input directory
    Process {
        /// Override paths.input_dir
        #[arg(long)]
        input_dir: Option<String>,

        /// Override paths.archive_dir
        #[arg(long)]
        archive_dir: Option<String>,

        /// Evaluate and print the report without touching any file
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete log files older than the retention window
    SweepLogs {
        /// Override retention.log_dir
        #[arg(long)]
        log_dir: Option<String>,

        /// Override retention.max_age_days
        #[arg(long)]
        max_age_days: Option<u64>,
    },
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入配置檔並套用命令列覆蓋設定
    pub fn load_config(&self) -> Result<HoldConfig> {
        let mut config = match &self.config {
            Some(path) => HoldConfig::from_file(path)?,
            None => HoldConfig::default(),
        };

        match &self.command {
            Command::Process {
                input_dir,
                archive_dir,
                ..
            } => {
                if let Some(dir) = input_dir {
                    config.paths.input_dir = dir.clone();
                }
                if let Some(dir) = archive_dir {
                    config.paths.archive_dir = dir.clone();
                }
            }
            Command::SweepLogs {
                log_dir,
                max_age_days,
            } => {
                if let Some(dir) = log_dir {
                    config.retention.log_dir = dir.clone();
                }
                if let Some(days) = max_age_days {
                    config.retention.max_age_days = *days;
                }
            }
        }

        Ok(config)
    }
}
