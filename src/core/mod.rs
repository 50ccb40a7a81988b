pub mod calculator;
pub mod catalog;
pub mod cell;
pub mod sheet;

pub use crate::domain::model::{CalculationRequest, CalculationResults, MetricValue};
pub use crate::domain::ports::AssetSource;
pub use crate::utils::error::Result;
