use crate::core::cell::CellRef;
use crate::domain::model::{CalculationRequest, IngredientInput};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{numeric_field, validate_range};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const EMBEDDED_CATALOG: &str = include_str!("catalog.toml");

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    pub quantity_min: f64,
    pub quantity_max: f64,
    pub cost_min: f64,
    pub cost_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRange {
    pub column: String,
    pub first_row: u32,
    pub last_row: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    limits: Limits,
    prompt_ranges: Vec<PromptRange>,
    labels: HashMap<String, String>,
}

/// The ingredient cells a user may fill in, their labels and accepted ranges.
#[derive(Debug, Clone)]
pub struct Catalog {
    prompt_cells: BTreeSet<String>,
    labels: HashMap<String, String>,
    limits: Limits,
}

impl Catalog {
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_CATALOG)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;

        let mut prompt_cells = BTreeSet::new();
        for range in &file.prompt_ranges {
            if range.first_row > range.last_row {
                return Err(AppError::InvalidConfigValueError {
                    field: "prompt_ranges".to_string(),
                    value: format!("{}{}:{}{}", range.column, range.first_row, range.column, range.last_row),
                    reason: "first_row must not exceed last_row".to_string(),
                });
            }
            for row in range.first_row..=range.last_row {
                prompt_cells.insert(CellRef::new(&range.column, row)?.to_string());
            }
        }

        for cell in file.labels.keys() {
            if !prompt_cells.contains(cell) {
                tracing::warn!("Label defined for non-prompt cell {}", cell);
            }
        }

        Ok(Self {
            prompt_cells,
            labels: file.labels,
            limits: file.limits,
        })
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.prompt_cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompt_cells.is_empty()
    }

    pub fn is_prompt_cell(&self, cell: &str) -> bool {
        self.prompt_cells.contains(cell)
    }

    pub fn prompt_cells(&self) -> impl Iterator<Item = &str> {
        self.prompt_cells.iter().map(String::as_str)
    }

    pub fn label<'a>(&'a self, cell: &'a str) -> &'a str {
        self.labels.get(cell).map(String::as_str).unwrap_or(cell)
    }

    /// `(cell, label)` pairs in string order of the cell name (`B10` sorts before `B2`).
    pub fn ingredients(&self) -> Vec<(&str, &str)> {
        self.prompt_cells()
            .map(|cell| (cell, self.label(cell)))
            .collect()
    }

    /// Checks a `/calculate` body and turns it into a typed request.
    pub fn validate_request(&self, body: &Value) -> Result<CalculationRequest> {
        let data = match body.as_object() {
            Some(obj) if !obj.is_empty() => obj,
            _ => return Err(rejected("No data provided", Vec::new())),
        };

        let entries = match data.get("ingredients").and_then(Value::as_object) {
            Some(obj) if !obj.is_empty() => obj,
            _ => return Err(rejected("No ingredients provided", Vec::new())),
        };

        let mut errors = Vec::new();
        let mut ingredients = BTreeMap::new();
        for (cell, values) in entries {
            if !self.is_prompt_cell(cell) {
                errors.push(format!("Invalid ingredient: {}", cell));
                continue;
            }
            let label = self.label(cell);

            let Some(fields) = values.as_object() else {
                errors.push(format!("{}: Invalid ingredient values", label));
                continue;
            };

            let quantity = match numeric_field(fields.get("quantity")) {
                Some(q) => {
                    if validate_range("quantity", q, self.limits.quantity_min, self.limits.quantity_max).is_err() {
                        errors.push(format!(
                            "{}: Quantity must be between {} and {} kg",
                            label, self.limits.quantity_min, self.limits.quantity_max
                        ));
                    }
                    q
                }
                None => {
                    errors.push(format!("{}: Invalid quantity value", label));
                    0.0
                }
            };

            let cost = match numeric_field(fields.get("cost")) {
                Some(c) => {
                    if validate_range("cost", c, self.limits.cost_min, self.limits.cost_max).is_err() {
                        errors.push(format!(
                            "{}: Cost must be between ₹{} and ₹{}/kg",
                            label, self.limits.cost_min, self.limits.cost_max
                        ));
                    }
                    c
                }
                None => {
                    errors.push(format!("{}: Invalid cost value", label));
                    0.0
                }
            };

            ingredients.insert(cell.clone(), IngredientInput { quantity, cost });
        }

        if !errors.is_empty() {
            tracing::debug!("Rejected calculation request: {:?}", errors);
            return Err(rejected("Validation failed", errors));
        }

        Ok(CalculationRequest { ingredients })
    }
}

fn rejected(message: &str, details: Vec<String>) -> AppError {
    AppError::ValidationError {
        message: message.to_string(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(err: AppError) -> (String, Vec<String>) {
        match err {
            AppError::ValidationError { message, details } => (message, details),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_embedded_catalog() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.len(), 44);
        assert!(catalog.is_prompt_cell("B2"));
        assert!(catalog.is_prompt_cell("B31"));
        assert!(catalog.is_prompt_cell("K15"));
        assert!(!catalog.is_prompt_cell("B32"));
        assert!(!catalog.is_prompt_cell("K1"));
        assert_eq!(catalog.label("B2"), "Maize");
        assert_eq!(catalog.label("K11"), "Biotin 2%");
        assert_eq!(catalog.limits().quantity_max, 100000.0);
    }

    #[test]
    fn test_ingredients_are_string_sorted() {
        let catalog = Catalog::embedded().unwrap();
        let cells: Vec<&str> = catalog.ingredients().iter().map(|(c, _)| *c).collect();
        assert_eq!(&cells[..4], &["B10", "B11", "B12", "B13"]);
        assert_eq!(cells.last(), Some(&"K9"));
    }

    #[test]
    fn test_label_falls_back_to_cell() {
        let catalog = Catalog::from_toml_str(
            r#"
[limits]
quantity_min = 0.0
quantity_max = 10.0
cost_min = 0.0
cost_max = 5.0

[[prompt_ranges]]
column = "C"
first_row = 1
last_row = 2

[labels]
C1 = "Corn"
"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label("C2"), "C2");
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = Catalog::from_toml_str(
            r#"
[limits]
quantity_min = 0.0
quantity_max = 10.0
cost_min = 0.0
cost_max = 5.0

[[prompt_ranges]]
column = "C"
first_row = 5
last_row = 2

[labels]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_request() {
        let catalog = Catalog::embedded().unwrap();
        let request = catalog
            .validate_request(&json!({
                "ingredients": {
                    "B2": {"quantity": 60, "cost": "22.5"},
                    "K2": {"quantity": 0.25}
                }
            }))
            .unwrap();

        assert_eq!(request.ingredients["B2"].quantity, 60.0);
        assert_eq!(request.ingredients["B2"].cost, 22.5);
        assert_eq!(request.ingredients["K2"].cost, 0.0);
    }

    #[test]
    fn test_missing_data_and_ingredients() {
        let catalog = Catalog::embedded().unwrap();

        let (message, _) = details(catalog.validate_request(&json!({})).unwrap_err());
        assert_eq!(message, "No data provided");

        let (message, _) = details(catalog.validate_request(&Value::Null).unwrap_err());
        assert_eq!(message, "No data provided");

        let (message, _) =
            details(catalog.validate_request(&json!({"ingredients": {}})).unwrap_err());
        assert_eq!(message, "No ingredients provided");
    }

    #[test]
    fn test_collects_every_problem() {
        let catalog = Catalog::embedded().unwrap();
        let err = catalog
            .validate_request(&json!({
                "ingredients": {
                    "A1": {"quantity": 1, "cost": 1},
                    "B2": {"quantity": -5, "cost": 20000},
                    "B3": {"quantity": "lots", "cost": [1]},
                    "B4": {"quantity": null, "cost": null}
                }
            }))
            .unwrap_err();

        let (message, details) = details(err);
        assert_eq!(message, "Validation failed");
        assert_eq!(
            details,
            vec![
                "Invalid ingredient: A1".to_string(),
                "Maize: Quantity must be between 0 and 100000 kg".to_string(),
                "Maize: Cost must be between ₹0 and ₹10000/kg".to_string(),
                "Jowar: Invalid quantity value".to_string(),
                "Jowar: Invalid cost value".to_string(),
                "B.Rice: Invalid quantity value".to_string(),
                "B.Rice: Invalid cost value".to_string(),
            ]
        );
    }
}
