use crate::config::toml_config::RescueConfig;
use crate::domain::model::{Finding, FindingCategory, Order, ProductSlot, Suborder};

/// 去掉商品代碼尾端的救援標記
pub fn strip_marker<'a>(code: &'a str, suffix: &str) -> &'a str {
    code.strip_suffix(suffix).unwrap_or(code)
}

pub fn marked_codes<'a>(codes: &[&'a str], suffix: &str) -> Vec<&'a str> {
    codes
        .iter()
        .copied()
        .filter(|code| code.ends_with(suffix))
        .collect()
}

/// 從整張訂單移除救援標記，回傳被處理的商品代碼 (已去標記)
pub fn remove_markers(order: &mut Order, suffix: &str) -> Vec<String> {
    let mut stripped = Vec::new();
    for suborder in &mut order.suborders {
        for slot in suborder.products.iter_mut().take_while(|s| !s.is_empty()) {
            if let Some(code) = slot.code.as_mut() {
                if let Some(base) = code.strip_suffix(suffix).map(str::to_string) {
                    *code = base;
                    stripped.push(code.clone());
                }
            }
        }
    }
    stripped
}

/// 新子訂單從第一筆子訂單複製聯絡與寄送欄位
fn copy_contact(from: &Suborder, to: &mut Suborder, extra_fields: &[String]) {
    to.lastname.clone_from(&from.lastname);
    to.firstname.clone_from(&from.firstname);
    to.slastname.clone_from(&from.slastname);
    to.sfirstname.clone_from(&from.sfirstname);
    to.cardholder.clone_from(&from.cardholder);
    to.shipvia.clone_from(&from.shipvia);
    to.scountry.clone_from(&from.scountry);
    to.saddress1.clone_from(&from.saddress1);
    to.saddress2.clone_from(&from.saddress2);
    to.custom01.clone_from(&from.custom01);
    for name in extra_fields {
        to.set_extra(name, from.extra(name).map(str::to_string));
    }
}

/// 有救援標記時：去掉標記並確保訂單中存在一個救援佔位商品
///
/// 最後一筆子訂單還有空欄位就填入；否則新增一筆子訂單。
pub fn inject_rescue(order: &mut Order, config: &RescueConfig) -> Option<Finding> {
    let stripped = remove_markers(order, &config.marker_suffix);
    if stripped.is_empty() {
        return None;
    }
    let codes = stripped.join(", ");

    let already_present = order
        .suborders
        .iter()
        .flat_map(|s| s.product_codes())
        .any(|code| code == config.placeholder_code);
    if already_present {
        return Some(Finding::note(
            FindingCategory::Rescue,
            format!(
                "rescue marker removed from {}; {} already present",
                codes, config.placeholder_code
            ),
        ));
    }

    let suborder_count = order.suborders.len();
    let last = order.suborders.last_mut()?;
    if let Some(slot) = last.first_free_slot() {
        last.products[slot] = ProductSlot::placeholder(&config.placeholder_code);
        tracing::debug!(
            "Rescue product placed in suborder {} slot {}",
            suborder_count,
            slot + 1
        );
        return Some(Finding::note(
            FindingCategory::Rescue,
            format!(
                "rescue marker removed from {}; {} added to suborder {} slot {}",
                codes,
                config.placeholder_code,
                suborder_count,
                slot + 1
            ),
        ));
    }

    let first = order.suborders.first()?;
    let mut extra = Suborder::blank_like(first);
    copy_contact(first, &mut extra, &config.copy_fields);
    extra.products[0] = ProductSlot::placeholder(&config.placeholder_code);
    order.suborders.push(extra);

    tracing::debug!("Rescue product placed in new suborder {}", suborder_count + 1);
    Some(Finding::note(
        FindingCategory::Rescue,
        format!(
            "rescue marker removed from {}; {} added in new suborder {}",
            codes,
            config.placeholder_code,
            suborder_count + 1
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn suborder(products: &[&str]) -> Suborder {
        let mut record = Record::new("import_ca");
        for (name, value) in [
            ("orderid", "A100"),
            ("firstname", "Ann"),
            ("lastname", "Lee"),
            ("shipvia", "UG"),
            ("scountry", "US"),
            ("saddress1", "1 Main St"),
            ("scity", "Reno"),
            ("promo_code", "SAVE10"),
        ] {
            record.set(name, Some(value.to_string()));
        }
        for slot in 0..5 {
            let n = slot + 1;
            let code = products.get(slot).map(|c| c.to_string());
            let filled = code.is_some();
            record.set(&format!("product{:02}", n), code);
            record.set(&format!("quantity{:02}", n), filled.then(|| "2.0000".to_string()));
            record.set(&format!("price{:02}", n), filled.then(|| "9.9900".to_string()));
            record.set(&format!("discount{:02}", n), filled.then(|| "0.0000".to_string()));
        }
        Suborder::from_record(&record)
    }

    fn order(suborders: Vec<Suborder>) -> Order {
        Order {
            order_number: "A100".to_string(),
            file_name: "A100.xml".to_string(),
            root_tag: "orders".to_string(),
            root_attributes: Vec::new(),
            xml_declaration: true,
            suborders,
            ..Default::default()
        }
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("19PS01-RS", "-RS"), "19PS01");
        assert_eq!(strip_marker("19PS01", "-RS"), "19PS01");
    }

    #[test]
    fn test_fills_free_slot_in_last_suborder() {
        let mut order = order(vec![suborder(&["A1-RS", "A2", "A3", "A4"])]);
        let finding = inject_rescue(&mut order, &RescueConfig::default()).unwrap();

        assert_eq!(order.suborders.len(), 1);
        let sub = &order.suborders[0];
        assert_eq!(sub.product_codes(), vec!["A1", "A2", "A3", "A4", "RESCUE"]);
        assert_eq!(sub.products[4], ProductSlot::placeholder("RESCUE"));
        assert_eq!(sub.products[4].quantity.as_deref(), Some("1.0000"));
        assert_eq!(sub.products[4].price.as_deref(), Some("0.0000"));
        assert_eq!(sub.products[4].discount.as_deref(), Some("0.0000"));
        assert_eq!(finding.category, FindingCategory::Rescue);
        assert!(finding.message.contains("slot 5"));
    }

    #[test]
    fn test_full_suborder_overflows_into_new_suborder() {
        let mut order = order(vec![suborder(&["A1", "A2-RS", "A3", "A4", "A5"])]);
        let finding = inject_rescue(&mut order, &RescueConfig::default()).unwrap();

        assert_eq!(order.suborders.len(), 2);
        let first = &order.suborders[0];
        let added = &order.suborders[1];
        assert_eq!(first.product_codes(), vec!["A1", "A2", "A3", "A4", "A5"]);
        assert_eq!(added.product_codes(), vec!["RESCUE"]);
        assert_eq!(added.firstname, first.firstname);
        assert_eq!(added.lastname, first.lastname);
        assert_eq!(added.shipvia, first.shipvia);
        assert_eq!(added.scountry, first.scountry);
        assert_eq!(added.saddress1, first.saddress1);
        assert_eq!(added.extra("scity"), Some("Reno"));
        assert_eq!(added.extra("orderid"), Some("A100"));
        assert_eq!(added.promo_code, None);
        assert!(finding.message.contains("new suborder 2"));
    }

    #[test]
    fn test_marker_in_earlier_suborder_uses_last_suborder() {
        let mut order = order(vec![
            suborder(&["A1-RS", "A2", "A3", "A4", "A5"]),
            suborder(&["B1"]),
        ]);
        inject_rescue(&mut order, &RescueConfig::default()).unwrap();

        assert_eq!(order.suborders.len(), 2);
        assert_eq!(order.suborders[0].product_codes()[0], "A1");
        assert_eq!(order.suborders[1].product_codes(), vec!["B1", "RESCUE"]);
    }

    #[test]
    fn test_placeholder_not_duplicated() {
        let mut order = order(vec![suborder(&["A1-RS", "RESCUE"])]);
        let finding = inject_rescue(&mut order, &RescueConfig::default()).unwrap();

        assert_eq!(order.suborders[0].product_codes(), vec!["A1", "RESCUE"]);
        assert!(finding.message.contains("already present"));
    }

    #[test]
    fn test_no_marker_no_change() {
        let mut order = order(vec![suborder(&["A1"])]);
        let before = order.clone();
        assert!(inject_rescue(&mut order, &RescueConfig::default()).is_none());
        assert_eq!(order, before);
    }
}
