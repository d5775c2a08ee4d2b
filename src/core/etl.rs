use crate::config::toml_config::ReportConfig;
use crate::core::report::{report_file_name, RunReport};
use crate::core::{Evaluation, Finding, Pipeline, Storage};
use crate::utils::error::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub files: usize,
    pub held: usize,
    pub errors: usize,
    pub report_file: Option<String>,
    pub report: RunReport,
}

/// 批次執行：逐一處理每個訂單檔案，單一檔案失敗不影響其他檔案
pub struct HoldEngine<P: Pipeline, R: Storage> {
    pipeline: P,
    report_storage: R,
    report_config: ReportConfig,
    today: Option<NaiveDate>,
    dry_run: bool,
}

impl<P: Pipeline, R: Storage> HoldEngine<P, R> {
    pub fn new(pipeline: P, report_storage: R, report_config: ReportConfig) -> Self {
        Self {
            pipeline,
            report_storage,
            report_config,
            today: None,
            dry_run: false,
        }
    }

    /// 固定「今天」的日期 (測試或補跑用)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// 只評估與輸出報告，不回寫、不搬移、不產生報告檔
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Local::now().naive_local();
        let today = self.today.unwrap_or_else(|| started_at.date());

        let files = self.pipeline.discover().await?;
        tracing::info!("📂 Found {} order files", files.len());

        let mut report = RunReport::default();
        for file_name in &files {
            let evaluation = self.process_file(file_name, today).await;
            let order_number = self.pipeline.order_number(file_name);
            if evaluation.hold {
                tracing::info!("⏸️ Order {} held ({})", order_number, file_name);
            }
            report.push(&order_number, file_name, evaluation.hold, evaluation.findings);
        }

        let report_file = self.write_report(&report, started_at).await;

        let summary = RunSummary {
            files: files.len(),
            held: report.held_count(),
            errors: report.error_count(),
            report_file,
            report,
        };
        tracing::info!(
            "✅ Processed {} files: {} held, {} with errors",
            summary.files,
            summary.held,
            summary.errors
        );
        Ok(summary)
    }

    async fn process_file(&self, file_name: &str, today: NaiveDate) -> Evaluation {
        tracing::info!("🔍 Looking in {}", file_name);
        let mut evaluation = Evaluation::default();

        match self.pipeline.extract(file_name).await {
            Ok(mut order) => {
                let (result, changed) = self.pipeline.transform(&mut order, today);
                evaluation = result;
                if changed && !self.dry_run {
                    if let Err(e) = self.pipeline.load(&order).await {
                        tracing::warn!("⚠️ Failed to rewrite {}: {}", file_name, e);
                        evaluation.push(Finding::error(format!("rewrite failed: {}", e)));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Skipping {}: {} (Category: {:?})",
                    file_name,
                    e,
                    e.category()
                );
                evaluation.push(Finding::error(e.to_string()));
            }
        }

        if !self.dry_run {
            match self.pipeline.archive(file_name).await {
                Ok(target) => tracing::debug!("Archived {} to {}", file_name, target),
                Err(e) => {
                    tracing::warn!("⚠️ {}", e);
                    evaluation.push(Finding::error(e.to_string()));
                }
            }
        }

        evaluation
    }

    async fn write_report(&self, report: &RunReport, started_at: NaiveDateTime) -> Option<String> {
        if report.is_empty() {
            tracing::info!("No findings; no report written");
            return None;
        }

        let text = report.render();
        if self.dry_run {
            println!("{}", text);
            return None;
        }

        let prefix = &self.report_config.file_prefix;
        let name = report_file_name(prefix, started_at, "txt");
        if let Err(e) = self.report_storage.write_file(&name, text.as_bytes()).await {
            // 報告寫不出去時至少留在標準錯誤輸出
            tracing::error!("❌ Failed to write report {}: {}", name, e);
            eprintln!("{}", text);
            return None;
        }

        if self.report_config.json_summary {
            let json_name = report_file_name(prefix, started_at, "json");
            let written = match report.to_json() {
                Ok(json) => self
                    .report_storage
                    .write_file(&json_name, json.as_bytes())
                    .await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tracing::warn!("⚠️ Failed to write JSON summary {}: {}", json_name, e);
            }
        }

        tracing::info!("📝 Report written: {}", name);
        Some(name)
    }
}
