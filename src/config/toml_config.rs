use crate::domain::ports::ConfigProvider;
use crate::utils::error::{HoldError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    pub paths: PathsConfig,
    pub order: OrderIdConfig,
    pub policy: PolicyConfig,
    pub rules: RuleConfig,
    pub shipping: ShippingConfig,
    pub rescue: RescueConfig,
    pub report: ReportConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: String,
    pub archive_dir: String,
    pub report_dir: String,
    pub extension: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: "./orders".to_string(),
            archive_dir: "./orders/archive".to_string(),
            report_dir: "./logs".to_string(),
            extension: "xml".to_string(),
        }
    }
}

/// 訂單編號取自檔名中固定位置的子字串
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderIdConfig {
    pub id_offset: usize,
    pub id_width: usize,
}

impl Default for OrderIdConfig {
    fn default() -> Self {
        Self {
            id_offset: 0,
            id_width: 9,
        }
    }
}

impl OrderIdConfig {
    pub fn order_number(&self, file_name: &str) -> String {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let chars: Vec<char> = stem.chars().collect();
        if chars.len() < self.id_offset + self.id_width {
            return stem.to_string();
        }
        chars[self.id_offset..self.id_offset + self.id_width]
            .iter()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationScope {
    /// 商品規則逐一檢查每筆子訂單自己的商品
    PerSuborder,
    /// 商品規則檢查整張訂單彙整後的商品
    PerOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub hold_years: i32,
    pub scope: EvaluationScope,
    pub multi_product_forces_hold: bool,
    pub fixed_discount_forces_hold: bool,
    pub normalization_forces_hold: bool,
    pub rescue_marker_forces_hold: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            hold_years: 4,
            scope: EvaluationScope::PerOrder,
            multi_product_forces_hold: false,
            fixed_discount_forces_hold: false,
            normalization_forces_hold: true,
            rescue_marker_forces_hold: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstringMode {
    Contains,
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoBoxMatcher {
    /// 地址第一或第二行以 p/P 開頭
    LeadingP,
    /// 地址第一行包含固定字串
    Substring { pattern: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoBoxRule {
    pub matcher: PoBoxMatcher,
    pub carriers: Vec<String>,
}

impl Default for PoBoxRule {
    fn default() -> Self {
        Self {
            matcher: PoBoxMatcher::LeadingP,
            carriers: vec!["1GD".to_string(), "FES".to_string(), "FE2".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedName {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub exact_skus: Vec<String>,
    pub partial_skus: Vec<String>,
    pub partial_match: SubstringMode,
    pub exempt_substrings: Vec<String>,
    pub will_call_code: String,
    pub home_country: String,
    pub fraud_names: Vec<WatchedName>,
    pub fixed_discount_marker: char,
    pub po_box: PoBoxRule,
}

impl Default for RuleConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            exact_skus: owned(&["19PS01", "04HS90"]),
            partial_skus: owned(&[
                "01HS", "01PP", "01RI", "06HS", "02SS", "02DD", "19HSIFC", "02CW", "12BW", "fg",
                "04RIG1", "04SFpdKit", "04AM",
            ]),
            partial_match: SubstringMode::Contains,
            exempt_substrings: Vec::new(),
            will_call_code: "WC".to_string(),
            home_country: "US".to_string(),
            fraud_names: Vec::new(),
            fixed_discount_marker: '$',
            po_box: PoBoxRule::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingConfig {
    /// 冗長的承運商名稱 -> 簡碼
    pub normalize: BTreeMap<String, String>,
    /// 簡碼 -> 附加到 custom01 的指示
    pub instructions: BTreeMap<String, String>,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        let normalize = [
            ("United Parcel Service - UPS Ground", "UG"),
            ("Federal Express - FedEx Ground", "1GD"),
            ("Federal Express - FedEx Standard Overnight", "FES"),
            ("Federal Express - FedEx 2Day", "FE2"),
        ];
        let instructions = [
            ("FES", "FedEx Standard Overnight: deliver to door, signature required."),
            ("FE2", "FedEx 2Day: deliver to door, signature required."),
        ];
        Self {
            normalize: normalize
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            instructions: instructions
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueConfig {
    pub marker_suffix: String,
    pub placeholder_code: String,
    /// 建立新子訂單時，除了型別化聯絡欄位外額外複製的欄位
    pub copy_fields: Vec<String>,
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            marker_suffix: "-RS".to_string(),
            placeholder_code: "RESCUE".to_string(),
            copy_fields: ["orderid", "email", "phone", "scompany", "scity", "sstate", "szip"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub file_prefix: String,
    pub json_summary: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "holds".to_string(),
            json_summary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub log_dir: String,
    pub max_age_days: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            log_dir: "./logs".to_string(),
            max_age_days: 60,
        }
    }
}

impl HoldConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HoldError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HoldError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ORDER_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HoldError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_path("paths.input_dir", &self.paths.input_dir)?;
        validate_path("paths.archive_dir", &self.paths.archive_dir)?;
        validate_path("paths.report_dir", &self.paths.report_dir)?;
        validate_extension("paths.extension", &self.paths.extension)?;

        if Path::new(&self.paths.input_dir) == Path::new(&self.paths.archive_dir) {
            return Err(HoldError::ConfigValidationError {
                field: "paths.archive_dir".to_string(),
                message: "Archive directory must differ from the input directory".to_string(),
            });
        }

        validate_positive_number("order.id_width", self.order.id_width, 1)?;
        validate_range("policy.hold_years", self.policy.hold_years, 1, 100)?;

        validate_non_empty_string("rules.will_call_code", &self.rules.will_call_code)?;
        validate_non_empty_string("rules.home_country", &self.rules.home_country)?;
        if let PoBoxMatcher::Substring { pattern } = &self.rules.po_box.matcher {
            validate_non_empty_string("rules.po_box.matcher.pattern", pattern)?;
        }

        validate_non_empty_string("rescue.marker_suffix", &self.rescue.marker_suffix)?;
        validate_non_empty_string("rescue.placeholder_code", &self.rescue.placeholder_code)?;
        if self.rescue.placeholder_code.ends_with(&self.rescue.marker_suffix) {
            return Err(HoldError::InvalidConfigValueError {
                field: "rescue.placeholder_code".to_string(),
                value: self.rescue.placeholder_code.clone(),
                reason: "Placeholder must not carry the rescue marker".to_string(),
            });
        }

        validate_non_empty_string("report.file_prefix", &self.report.file_prefix)?;
        validate_path("retention.log_dir", &self.retention.log_dir)?;
        validate_positive_number(
            "retention.max_age_days",
            self.retention.max_age_days as usize,
            1,
        )?;

        Ok(())
    }
}

impl ConfigProvider for HoldConfig {
    fn input_dir(&self) -> &str {
        &self.paths.input_dir
    }

    fn archive_dir(&self) -> &str {
        &self.paths.archive_dir
    }

    fn report_dir(&self) -> &str {
        &self.paths.report_dir
    }

    fn file_extension(&self) -> &str {
        &self.paths.extension
    }
}

impl Validate for HoldConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
