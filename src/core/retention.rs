use crate::utils::error::{HoldError, Result};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::fs;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub scanned: usize,
    pub deleted: Vec<String>,
    pub failed: usize,
}

/// 刪除目錄中最後修改時間早於保留期限的檔案
///
/// 子目錄略過不處理；單一檔案刪除失敗只記錄警告。
pub async fn sweep_logs(dir: &str, max_age_days: u64, now: SystemTime) -> Result<SweepSummary> {
    let max_age = Duration::from_secs(max_age_days * SECONDS_PER_DAY);
    let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|source| HoldError::InputUnavailable {
            path: dir.to_string(),
            source,
        })?;

    let mut summary = SweepSummary::default();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("⚠️ Cannot stat {}: {}", path.display(), e);
                summary.failed += 1;
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        summary.scanned += 1;

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("⚠️ No modification time for {}: {}", path.display(), e);
                summary.failed += 1;
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("🗑️ Deleted {}", path.display());
                summary.deleted.push(display_name(&path));
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to delete {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    summary.deleted.sort();
    tracing::info!(
        "🧹 Log sweep of {}: scanned {}, deleted {}, failed {}",
        dir,
        summary.scanned,
        summary.deleted.len(),
        summary.failed
    );
    Ok(summary)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_days: u64, now: SystemTime) {
        let path = dir.join(name);
        std::fs::write(&path, "log").unwrap();
        let modified = now - Duration::from_secs(age_days * SECONDS_PER_DAY);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[tokio::test]
    async fn test_deletes_only_files_older_than_window() {
        let dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        touch(dir.path(), "old.log", 61, now);
        touch(dir.path(), "older.log", 400, now);
        touch(dir.path(), "recent.log", 59, now);
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let summary = sweep_logs(&dir.path().to_string_lossy(), 60, now)
            .await
            .unwrap();

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.deleted, vec!["old.log".to_string(), "older.log".to_string()]);
        assert_eq!(summary.failed, 0);
        assert!(dir.path().join("recent.log").exists());
        assert!(dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let err = sweep_logs("/definitely/not/here", 60, SystemTime::now())
            .await
            .unwrap_err();
        assert!(matches!(err, HoldError::InputUnavailable { .. }));
    }
}
