pub mod etl;
pub mod hold;
pub mod holddate;
pub mod pipeline;
pub mod report;
pub mod rescue;
pub mod retention;
pub mod shipping;

pub use crate::domain::model::{Evaluation, Finding, FindingCategory, Order, Suborder};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
