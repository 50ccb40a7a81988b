use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// One submitted ingredient after validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IngredientInput {
    pub quantity: f64,
    pub cost: f64,
}

/// Built by `Catalog::validate_request`; never deserialized directly, since
/// each field needs its own validation message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CalculationRequest {
    pub ingredients: BTreeMap<String, IngredientInput>,
}

/// A computed metric: a number, or `NA` when the inputs cannot produce one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    NotAvailable,
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::NotAvailable => None,
        }
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            MetricValue::Number(v) => MetricValue::Number(f(v)),
            MetricValue::NotAvailable => MetricValue::NotAvailable,
        }
    }

    /// Rounds to 4 decimal places; non-finite values become `NA`.
    ///
    /// Rounding goes through decimal formatting, which rounds the exact binary
    /// value: `0.00035` is stored just below the tie and rounds to `0.0003`.
    pub fn rounded(self) -> Self {
        match self {
            MetricValue::Number(v) if v.is_finite() => match format!("{:.4}", v).parse::<f64>() {
                // avoid serializing -0.0
                Ok(r) => MetricValue::Number(if r == 0.0 { 0.0 } else { r }),
                Err(_) => MetricValue::NotAvailable,
            },
            _ => MetricValue::NotAvailable,
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(v) => serializer.serialize_f64(*v),
            MetricValue::NotAvailable => serializer.serialize_str("NA"),
        }
    }
}

pub type CalculationResults = BTreeMap<&'static str, MetricValue>;

#[derive(Debug, Clone, Serialize)]
pub struct CalculationResponse {
    pub success: bool,
    pub results: CalculationResults,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub id: usize,
    pub capacity: usize,
    pub in_flight: usize,
    pub served: u64,
    pub timed_out: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub csv_loaded: bool,
    pub csv_rows: usize,
    pub ingredients_count: usize,
    pub workers: Vec<WorkerSnapshot>,
}
