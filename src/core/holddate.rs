use crate::domain::model::{Finding, FindingCategory, Order};
use chrono::{Datelike, NaiveDate};

pub const HOLD_DATE_FORMAT: &str = "%Y-%m-%d";

/// 同月同日往後推 `years` 年；2/29 遇到非閏年改為 3/1
pub fn add_years(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let year = date.year().checked_add(years)?;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// 將保留日期寫入訂單所有子訂單
pub fn set_holddate(order: &mut Order, today: NaiveDate, years: i32) -> Finding {
    let Some(date) = add_years(today, years) else {
        return Finding::error(format!(
            "hold date out of range: {} + {} years",
            today, years
        ));
    };

    let value = date.format(HOLD_DATE_FORMAT).to_string();
    for suborder in &mut order.suborders {
        suborder.holddate = Some(value.clone());
    }

    Finding::note(FindingCategory::HoldDate, format!("hold date set to {}", value))
}
