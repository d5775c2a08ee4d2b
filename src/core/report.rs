use crate::domain::model::Finding;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct OrderReport {
    pub order_number: String,
    pub file_name: String,
    pub hold: bool,
    pub findings: Vec<Finding>,
}

/// 整批執行的報告；依處理順序累積每張訂單的發現
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub orders: Vec<OrderReport>,
}

impl RunReport {
    /// 沒有任何發現的訂單不列入報告
    pub fn push(&mut self, order_number: &str, file_name: &str, hold: bool, findings: Vec<Finding>) {
        if findings.is_empty() {
            return;
        }
        self.orders.push(OrderReport {
            order_number: order_number.to_string(),
            file_name: file_name.to_string(),
            hold,
            findings,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn held_count(&self) -> usize {
        self.orders.iter().filter(|o| o.hold).count()
    }

    pub fn error_count(&self) -> usize {
        self.orders
            .iter()
            .filter(|o| o.findings.iter().any(Finding::is_error))
            .count()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> crate::utils::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for order in &self.orders {
            let status = if order.hold { " HOLD" } else { "" };
            writeln!(f, "Order {} ({}){}", order.order_number, order.file_name, status)?;
            for finding in &order.findings {
                if finding.is_error() {
                    writeln!(f, "  ! error: {}", finding.message)?;
                } else {
                    writeln!(f, "  - [{}] {}", finding.category, finding.message)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn report_file_name(prefix: &str, started_at: NaiveDateTime, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        started_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}
