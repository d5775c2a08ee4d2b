use crate::config::toml_config::{
    EvaluationScope, HoldConfig, PoBoxMatcher, PolicyConfig, RescueConfig, RuleConfig,
    SubstringMode,
};
use crate::core::rescue::{marked_codes, strip_marker};
use crate::domain::model::{Evaluation, Finding, FindingCategory, Order, Suborder};

/// 保留規則評估器
///
/// 規則彼此獨立且不提前結束，依固定順序執行：
/// 詐騙名單、多商品、精確 SKU、部分 SKU、無寄送方式、自取、國際、
/// PO Box + 承運商、持卡人姓名不符、固定折扣促銷碼、救援標記。
pub struct HoldEvaluator<'a> {
    rules: &'a RuleConfig,
    policy: &'a PolicyConfig,
    rescue: &'a RescueConfig,
}

impl<'a> HoldEvaluator<'a> {
    pub fn new(config: &'a HoldConfig) -> Self {
        Self {
            rules: &config.rules,
            policy: &config.policy,
            rescue: &config.rescue,
        }
    }

    pub fn evaluate_order(&self, order: &Order) -> Evaluation {
        match self.policy.scope {
            EvaluationScope::PerSuborder => {
                let mut evaluation = Evaluation::default();
                for suborder in &order.suborders {
                    evaluation.extend(self.evaluate_suborder(suborder));
                }
                evaluation
            }
            EvaluationScope::PerOrder => {
                let codes = order.all_product_codes();
                let mut evaluation = Evaluation::default();
                for suborder in &order.suborders {
                    evaluation.extend(self.check_identity(suborder));
                }
                evaluation.extend(self.check_products(&codes));
                for suborder in &order.suborders {
                    evaluation.extend(self.check_delivery(suborder));
                }
                evaluation.extend(self.check_rescue(&codes));
                evaluation
            }
        }
    }

    pub fn evaluate_suborder(&self, suborder: &Suborder) -> Evaluation {
        let codes = suborder.product_codes();
        let mut evaluation = self.check_identity(suborder);
        evaluation.extend(self.check_products(&codes));
        evaluation.extend(self.check_delivery(suborder));
        evaluation.extend(self.check_rescue(&codes));
        evaluation
    }

    fn check_identity(&self, suborder: &Suborder) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let first = suborder.firstname.as_deref().map(str::trim);
        let last = suborder.lastname.as_deref().map(str::trim);

        if let (Some(first), Some(last)) = (first, last) {
            let watched = self.rules.fraud_names.iter().any(|name| {
                name.first.trim().eq_ignore_ascii_case(first)
                    && name.last.trim().eq_ignore_ascii_case(last)
            });
            if watched {
                evaluation.push(Finding::hold(
                    FindingCategory::Fraud,
                    format!("known fraud name {} {}: signature required", first, last),
                ));
            }
        }
        evaluation
    }

    fn check_products(&self, codes: &[&str]) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let codes: Vec<&str> = codes
            .iter()
            .map(|code| strip_marker(code, &self.rescue.marker_suffix))
            .collect();

        if codes.len() >= 2 {
            evaluation.push(Finding {
                category: FindingCategory::Product,
                message: format!("multiple products: {}", codes.len()),
                hold: self.policy.multi_product_forces_hold,
            });
        }

        let exact = unique(
            codes
                .iter()
                .copied()
                .filter(|code| self.rules.exact_skus.iter().any(|sku| sku.as_str() == *code)),
        );
        if !exact.is_empty() {
            evaluation.push(Finding::hold(
                FindingCategory::Product,
                format!("exact SKU match: {}", exact.join(", ")),
            ));
        }

        // 先排除豁免代碼，再比對部分 SKU
        let partial = unique(
            codes
                .iter()
                .copied()
                .filter(|code| !self.is_exempt(code))
                .filter(|code| self.matches_partial(code)),
        );
        if !partial.is_empty() {
            evaluation.push(Finding::hold(
                FindingCategory::Product,
                format!("partial SKU match: {}", partial.join(", ")),
            ));
        }

        evaluation
    }

    fn is_exempt(&self, code: &str) -> bool {
        self.rules
            .exempt_substrings
            .iter()
            .any(|exempt| code.contains(exempt.as_str()))
    }

    fn matches_partial(&self, code: &str) -> bool {
        self.rules
            .partial_skus
            .iter()
            .any(|part| match self.rules.partial_match {
                SubstringMode::Contains => code.contains(part.as_str()),
                SubstringMode::Prefix => code.starts_with(part.as_str()),
            })
    }

    fn check_delivery(&self, suborder: &Suborder) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let shipvia = suborder
            .shipvia
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match shipvia {
            None => evaluation.push(Finding::hold(
                FindingCategory::Shipping,
                "no shipping method",
            )),
            Some(code) if code == self.rules.will_call_code => evaluation.push(Finding::hold(
                FindingCategory::Shipping,
                "will call / pick up order",
            )),
            Some(_) => {}
        }

        let country = suborder.scountry.as_deref().map(str::trim).unwrap_or("");
        if country != self.rules.home_country {
            let shown = if country.is_empty() { "none" } else { country };
            evaluation.push(Finding::hold(
                FindingCategory::Address,
                format!("international destination: {}", shown),
            ));
        }

        if let Some(code) = shipvia {
            if self.rules.po_box.carriers.iter().any(|c| c == code) && self.is_po_box(suborder) {
                evaluation.push(Finding::hold(
                    FindingCategory::Address,
                    format!("PO box address with carrier {}", code),
                ));
            }
        }

        if let Some(holder) = suborder.cardholder.as_deref().map(normalize_name) {
            if !holder.is_empty() {
                let differs = |name: Option<String>| {
                    name.map(|n| normalize_name(&n) != holder).unwrap_or(false)
                };
                if differs(suborder.billing_name()) || differs(suborder.shipping_name()) {
                    evaluation.push(Finding::hold(
                        FindingCategory::Fraud,
                        format!("cardholder name mismatch: {}", holder),
                    ));
                }
            }
        }

        if let Some(promo) = suborder.promo_code.as_deref().map(str::trim) {
            if promo.ends_with(self.rules.fixed_discount_marker) {
                evaluation.push(Finding {
                    category: FindingCategory::Promo,
                    message: format!(
                        "fixed discount promo code {}: apply coupon in order system",
                        promo
                    ),
                    hold: self.policy.fixed_discount_forces_hold,
                });
            }
        }

        evaluation
    }

    fn is_po_box(&self, suborder: &Suborder) -> bool {
        match &self.rules.po_box.matcher {
            PoBoxMatcher::LeadingP => [&suborder.saddress1, &suborder.saddress2]
                .into_iter()
                .filter_map(|line| line.as_deref())
                .any(|line| {
                    line.trim_start()
                        .chars()
                        .next()
                        .is_some_and(|c| c.eq_ignore_ascii_case(&'p'))
                }),
            PoBoxMatcher::Substring { pattern } => suborder
                .saddress1
                .as_deref()
                .is_some_and(|line| line.contains(pattern.as_str())),
        }
    }

    fn check_rescue(&self, codes: &[&str]) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let marked = marked_codes(codes, &self.rescue.marker_suffix);
        if !marked.is_empty() {
            evaluation.push(Finding {
                category: FindingCategory::Rescue,
                message: format!("rescue marker on {}", marked.join(", ")),
                hold: self.policy.rescue_marker_forces_hold,
            });
        }
        evaluation
    }
}

fn unique<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for code in codes {
        if !seen.contains(&code) {
            seen.push(code);
        }
    }
    seen
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
