use crate::config::toml_config::{PolicyConfig, ShippingConfig};
use crate::domain::model::{Evaluation, Finding, FindingCategory, Suborder};

/// 將冗長的承運商名稱改寫為簡碼，並替特定簡碼附加配送指示
///
/// 回傳評估結果與子訂單是否被修改。對已正規化的子訂單重複執行不會有任何變化。
pub fn normalize_shipping(
    suborder: &mut Suborder,
    shipping: &ShippingConfig,
    policy: &PolicyConfig,
) -> (Evaluation, bool) {
    let mut evaluation = Evaluation::default();
    let mut changed = false;

    let short_code = suborder
        .shipvia
        .as_deref()
        .and_then(|verbose| shipping.normalize.get(verbose.trim()))
        .cloned();

    if let Some(code) = short_code {
        let verbose = suborder.shipvia.replace(code.clone()).unwrap_or_default();
        tracing::debug!("Shipvia normalized: '{}' -> '{}'", verbose, code);
        evaluation.push(Finding {
            category: FindingCategory::Shipping,
            message: format!("shipping method normalized: {} -> {}", verbose, code),
            hold: policy.normalization_forces_hold,
        });
        changed = true;
    }

    let instruction = suborder
        .shipvia
        .as_deref()
        .map(str::trim)
        .and_then(|code| shipping.instructions.get(code).map(|text| (code, text)));

    if let Some((code, text)) = instruction {
        let updated = match suborder.custom01.as_deref() {
            Some(existing) if existing.contains(text.as_str()) => None,
            Some(existing) if !existing.trim().is_empty() => {
                Some(format!("{}\n\n{}", existing, text))
            }
            _ => Some(text.clone()),
        };
        if let Some(updated) = updated {
            evaluation.push(Finding::note(
                FindingCategory::Shipping,
                format!("delivery instructions added for {}", code),
            ));
            suborder.custom01 = Some(updated);
            changed = true;
        }
    }

    (evaluation, changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn suborder(shipvia: Option<&str>, custom01: Option<&str>) -> Suborder {
        let mut record = Record::new("import_ca");
        record.set("shipvia", shipvia.map(str::to_string));
        record.set("custom01", custom01.map(str::to_string));
        Suborder::from_record(&record)
    }

    #[test]
    fn test_ups_ground_becomes_ug_with_one_hold_finding() {
        let shipping = ShippingConfig::default();
        let policy = PolicyConfig::default();
        let mut sub = suborder(Some("United Parcel Service - UPS Ground"), None);

        let (eval, changed) = normalize_shipping(&mut sub, &shipping, &policy);

        assert!(changed);
        assert!(eval.hold);
        assert_eq!(sub.shipvia.as_deref(), Some("UG"));
        assert_eq!(eval.findings.len(), 1);
        assert_eq!(eval.findings[0].category, FindingCategory::Shipping);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let shipping = ShippingConfig::default();
        let policy = PolicyConfig::default();
        let mut sub = suborder(Some("United Parcel Service - UPS Ground"), None);
        normalize_shipping(&mut sub, &shipping, &policy);

        let before = sub.clone();
        let (eval, changed) = normalize_shipping(&mut sub, &shipping, &policy);

        assert!(!changed);
        assert!(eval.findings.is_empty());
        assert_eq!(sub, before);
    }

    #[test]
    fn test_instruction_appended_after_blank_line() {
        let shipping = ShippingConfig::default();
        let policy = PolicyConfig::default();
        let mut sub = suborder(
            Some("Federal Express - FedEx Standard Overnight"),
            Some("Gift wrap"),
        );

        let (eval, changed) = normalize_shipping(&mut sub, &shipping, &policy);

        assert!(changed);
        assert_eq!(sub.shipvia.as_deref(), Some("FES"));
        let expected = format!("Gift wrap\n\n{}", shipping.instructions["FES"]);
        assert_eq!(sub.custom01.as_deref(), Some(expected.as_str()));
        assert_eq!(eval.findings.len(), 2);

        // 第二次執行不會重複附加
        let (_, changed) = normalize_shipping(&mut sub, &shipping, &policy);
        assert!(!changed);
        assert_eq!(sub.custom01.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_instruction_on_empty_comment() {
        let shipping = ShippingConfig::default();
        let policy = PolicyConfig::default();
        let mut sub = suborder(Some("FE2"), None);

        let (eval, changed) = normalize_shipping(&mut sub, &shipping, &policy);

        assert!(changed);
        assert!(!eval.hold);
        assert_eq!(sub.custom01.as_deref(), Some(shipping.instructions["FE2"].as_str()));
    }

    #[test]
    fn test_instruction_matches_padded_code() {
        let shipping = ShippingConfig::default();
        let mut sub = suborder(Some("FES "), None);

        let (eval, changed) = normalize_shipping(&mut sub, &shipping, &PolicyConfig::default());

        assert!(changed);
        assert_eq!(sub.custom01.as_deref(), Some(shipping.instructions["FES"].as_str()));
        assert_eq!(eval.messages(), vec!["delivery instructions added for FES"]);
    }

    #[test]
    fn test_missing_shipvia_is_left_to_the_evaluator() {
        let mut sub = suborder(None, None);
        let (eval, changed) =
            normalize_shipping(&mut sub, &ShippingConfig::default(), &PolicyConfig::default());
        assert!(!changed);
        assert!(eval.findings.is_empty());
    }

    #[test]
    fn test_normalization_hold_follows_policy() {
        let policy = PolicyConfig {
            normalization_forces_hold: false,
            ..PolicyConfig::default()
        };
        let mut sub = suborder(Some("United Parcel Service - UPS Ground"), None);
        let (eval, changed) = normalize_shipping(&mut sub, &ShippingConfig::default(), &policy);
        assert!(changed);
        assert!(!eval.hold);
    }
}
