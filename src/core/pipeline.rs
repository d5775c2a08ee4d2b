use crate::adapters::xml::{parse_order, render_order};
use crate::config::toml_config::HoldConfig;
use crate::core::hold::HoldEvaluator;
use crate::core::holddate::set_holddate;
use crate::core::rescue::inject_rescue;
use crate::core::shipping::normalize_shipping;
use crate::core::{ConfigProvider, Evaluation, Order, Pipeline, Storage};
use crate::utils::error::{HoldError, Result};
use chrono::NaiveDate;

/// 訂單檔案處理管道：解析 → 寄送方式正規化 → 保留評估 → 救援商品 + 保留日期 → 回寫
pub struct OrderPipeline<S: Storage> {
    storage: S,
    config: HoldConfig,
}

impl<S: Storage> OrderPipeline<S> {
    pub fn new(storage: S, config: HoldConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &HoldConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for OrderPipeline<S> {
    async fn discover(&self) -> Result<Vec<String>> {
        let files = self.storage.list_files(self.config.file_extension()).await?;
        tracing::debug!(
            "Discovered {} .{} files in {}",
            files.len(),
            self.config.file_extension(),
            self.config.input_dir()
        );
        Ok(files)
    }

    fn order_number(&self, file_name: &str) -> String {
        self.config.order.order_number(file_name)
    }

    async fn extract(&self, file_name: &str) -> Result<Order> {
        let bytes = self.storage.read_file(file_name).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| HoldError::malformed(file_name, format!("not valid UTF-8: {}", e)))?;
        let order = parse_order(file_name, &self.order_number(file_name), &text)?;
        tracing::debug!(
            "Parsed {} with {} suborder(s)",
            file_name,
            order.suborders.len()
        );
        Ok(order)
    }

    fn transform(&self, order: &mut Order, today: NaiveDate) -> (Evaluation, bool) {
        let mut evaluation = Evaluation::default();
        let mut changed = false;

        for suborder in &mut order.suborders {
            let (normalized, modified) =
                normalize_shipping(suborder, &self.config.shipping, &self.config.policy);
            evaluation.extend(normalized);
            changed |= modified;
        }

        evaluation.extend(HoldEvaluator::new(&self.config).evaluate_order(order));

        if evaluation.hold {
            if let Some(finding) = inject_rescue(order, &self.config.rescue) {
                evaluation.push(finding);
            }
            evaluation.push(set_holddate(order, today, self.config.policy.hold_years));
            changed = true;
        }

        (evaluation, changed)
    }

    async fn load(&self, order: &Order) -> Result<()> {
        let bytes = render_order(order)?;
        self.storage.write_file(&order.file_name, &bytes).await?;
        tracing::debug!("Rewrote {} ({} bytes)", order.file_name, bytes.len());
        Ok(())
    }

    async fn archive(&self, file_name: &str) -> Result<String> {
        self.storage
            .move_file(file_name, self.config.archive_dir())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FindingCategory;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        moved: Arc<Mutex<Vec<String>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        }
    }

    impl Storage for MockStorage {
        async fn list_files(&self, extension: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let mut names: Vec<String> = files
                .keys()
                .filter(|name| name.ends_with(&format!(".{}", extension)))
                .cloned()
                .collect();
            names.sort();
            Ok(names)
        }

        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                HoldError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn move_file(&self, path: &str, target_dir: &str) -> Result<String> {
            let mut files = self.files.lock().await;
            files.remove(path);
            let target = format!("{}/{}", target_dir, path);
            self.moved.lock().await.push(target.clone());
            Ok(target)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    const HELD: &str = "<orders><import_ca>\
        <firstname>Ann</firstname><lastname>Lee</lastname>\
        <shipvia>United Parcel Service - UPS Ground</shipvia><scountry>US</scountry>\
        <saddress1>1 Main St</saddress1>\
        <product01>A1-RS</product01><product02/>\
        <holddate/>\
        </import_ca></orders>";

    const CLEAN: &str = "<orders><import_ca>\
        <shipvia>UG</shipvia><scountry>US</scountry><saddress1>1 Main St</saddress1>\
        <product01>A1</product01><holddate/>\
        </import_ca></orders>";

    #[tokio::test]
    async fn test_transform_held_order() {
        let storage = MockStorage::default();
        storage.put("A100.xml", HELD).await;
        let pipeline = OrderPipeline::new(storage.clone(), HoldConfig::default());

        let mut order = pipeline.extract("A100.xml").await.unwrap();
        let (eval, changed) = pipeline.transform(&mut order, today());

        assert!(changed);
        assert!(eval.hold);
        let sub = &order.suborders[0];
        assert_eq!(sub.shipvia.as_deref(), Some("UG"));
        assert_eq!(sub.product_codes(), vec!["A1", "RESCUE"]);
        assert_eq!(sub.holddate.as_deref(), Some("2030-10-19"));
        let categories: Vec<FindingCategory> = eval.findings.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![
                FindingCategory::Shipping,
                FindingCategory::Rescue,
                FindingCategory::Rescue,
                FindingCategory::HoldDate
            ]
        );

        pipeline.load(&order).await.unwrap();
        let written = storage.get_file("A100.xml").await.unwrap();
        assert!(written.contains("<holddate>2030-10-19</holddate>"));
        assert!(written.contains("<product02>RESCUE</product02>"));
        assert!(written.contains("<quantity02>1.0000</quantity02>"));
    }

    #[tokio::test]
    async fn test_transform_clean_order_is_untouched() {
        let storage = MockStorage::default();
        storage.put("B200.xml", CLEAN).await;
        let pipeline = OrderPipeline::new(storage, HoldConfig::default());

        let mut order = pipeline.extract("B200.xml").await.unwrap();
        let before = order.clone();
        let (eval, changed) = pipeline.transform(&mut order, today());

        assert!(!changed);
        assert!(!eval.hold);
        assert!(eval.findings.is_empty());
        assert_eq!(order, before);
    }

    #[tokio::test]
    async fn test_discover_and_archive() {
        let storage = MockStorage::default();
        storage.put("B200.xml", CLEAN).await;
        storage.put("A100.xml", HELD).await;
        storage.put("notes.txt", "x").await;
        let pipeline = OrderPipeline::new(storage.clone(), HoldConfig::default());

        let files = pipeline.discover().await.unwrap();
        assert_eq!(files, vec!["A100.xml".to_string(), "B200.xml".to_string()]);

        let target = pipeline.archive("A100.xml").await.unwrap();
        assert_eq!(target, "./orders/archive/A100.xml");
        assert!(storage.get_file("A100.xml").await.is_none());
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_utf8() {
        let storage = MockStorage::default();
        storage
            .write_file("bad.xml", &[0x3c, 0xff, 0xfe])
            .await
            .unwrap();
        let pipeline = OrderPipeline::new(storage, HoldConfig::default());

        let err = pipeline.extract("bad.xml").await.unwrap_err();
        assert!(matches!(err, HoldError::MalformedRecord { .. }));
    }
}
