use crate::domain::ports::Storage;
use crate::utils::error::{HoldError, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn list_files(&self, extension: &str) -> Result<Vec<String>> {
        let mut entries =
            fs::read_dir(&self.base_path)
                .await
                .map_err(|source| HoldError::InputUnavailable {
                    path: self.base_path.clone(),
                    source,
                })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if matches {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(full_path, data).await?;
        Ok(())
    }

    async fn move_file(&self, path: &str, target_dir: &str) -> Result<String> {
        let source = self.resolve(path);
        let archive_error = |source| HoldError::ArchiveError {
            file: path.to_string(),
            source,
        };

        let file_name = source
            .file_name()
            .ok_or_else(|| archive_error(std::io::Error::other("path has no file name")))?;

        fs::create_dir_all(target_dir).await.map_err(archive_error)?;
        let target = unique_target(Path::new(target_dir), Path::new(file_name))
            .await
            .map_err(archive_error)?;

        // rename 跨磁碟會失敗，改用複製後刪除
        if fs::rename(&source, &target).await.is_err() {
            fs::copy(&source, &target).await.map_err(archive_error)?;
            fs::remove_file(&source).await.map_err(archive_error)?;
        }

        Ok(target.to_string_lossy().into_owned())
    }
}

/// 封存目錄已有同名檔案時，加上時間戳記 (必要時再加序號) 避免覆蓋
async fn unique_target(dir: &Path, file_name: &Path) -> std::io::Result<PathBuf> {
    let target = dir.join(file_name);
    if !fs::try_exists(&target).await? {
        return Ok(target);
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let mut counter = 0u32;
    loop {
        let candidate = match counter {
            0 => dir.join(format!("{}_{}{}", stem, stamp, extension)),
            n => dir.join(format!("{}_{}_{}{}", stem, stamp, n, extension)),
        };
        if !fs::try_exists(&candidate).await? {
            tracing::warn!(
                "⚠️ {} already archived; keeping both as {}",
                file_name.display(),
                candidate.display()
            );
            return Ok(candidate);
        }
        counter += 1;
    }
}
