use crate::domain::model::{Evaluation, Order};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    /// 列出指定副檔名的檔案名稱 (依名稱排序)
    fn list_files(
        &self,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 將檔案移到另一個目錄，回傳新的完整路徑
    fn move_file(
        &self,
        path: &str,
        target_dir: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_dir(&self) -> &str;
    fn archive_dir(&self) -> &str;
    fn report_dir(&self) -> &str;
    fn file_extension(&self) -> &str;
}

/// 處理一個訂單檔案的三個階段
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn discover(&self) -> Result<Vec<String>>;
    fn order_number(&self, file_name: &str) -> String;
    async fn extract(&self, file_name: &str) -> Result<Order>;
    /// 就地修改訂單；回傳評估結果與訂單是否被修改
    fn transform(&self, order: &mut Order, today: NaiveDate) -> (Evaluation, bool);
    async fn load(&self, order: &Order) -> Result<()>;
    async fn archive(&self, file_name: &str) -> Result<String>;
}
