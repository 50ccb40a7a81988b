//! Feed formulation metrics.
//!
//! The workbook lays out ingredient quantities in `B2:B41` and, for every
//! nutrient column, the per-kg composition of those same ingredients in rows
//! 43 to 82. Each nutrient total is the SUMPRODUCT of the two ranges; most
//! metrics divide it by the total batch quantity (`F1`).

use crate::core::catalog::Catalog;
use crate::core::cell::CellRef;
use crate::core::sheet::Sheet;
use crate::domain::model::{CalculationRequest, CalculationResults, MetricValue};
use crate::utils::error::Result;
use std::collections::HashMap;

const QUANTITY_COLUMN: &str = "B";
const QUANTITY_FIRST_ROW: u32 = 2;
const QUANTITY_LAST_ROW: u32 = 41;
const COMPOSITION_FIRST_ROW: u32 = 43;

const COMPOSITION_COLUMNS: &[&str] = &[
    "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U",
    "V", "W", "X", "Y", "Z", "AA", "AB", "AC", "AD", "AE", "AF", "AS",
];

const BAG_WEIGHT_KG: f64 = 75.0;
const BAG_PRICE_CELL: &str = "H21";

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Evaluates one submitted formulation against the sheet. User quantities
/// shadow the sheet for prompt cells.
pub struct Calculator<'a> {
    sheet: &'a Sheet,
    catalog: &'a Catalog,
    request: &'a CalculationRequest,
}

/// Intermediate sums shared by all metrics.
#[derive(Debug, Clone)]
pub struct Totals {
    pub quantity: f64,
    nutrients: HashMap<&'static str, f64>,
}

impl Totals {
    /// Nutrient total for a composition column (the row-83 SUMPRODUCT).
    pub fn nutrient(&self, column: &str) -> f64 {
        self.nutrients.get(column).copied().unwrap_or(0.0)
    }

    /// Nutrient total per kg of feed.
    pub fn per_kg(&self, column: &str) -> f64 {
        ratio(self.nutrient(column), self.quantity)
    }
}

impl<'a> Calculator<'a> {
    pub fn new(sheet: &'a Sheet, catalog: &'a Catalog, request: &'a CalculationRequest) -> Self {
        Self {
            sheet,
            catalog,
            request,
        }
    }

    fn quantity(&self, cell: &str) -> f64 {
        self.request
            .ingredients
            .get(cell)
            .map(|i| i.quantity)
            .unwrap_or(0.0)
    }

    fn cell_value(&self, cell: &CellRef) -> f64 {
        let name = cell.to_string();
        if self.catalog.is_prompt_cell(&name) {
            self.quantity(&name)
        } else {
            self.sheet.value(cell)
        }
    }

    pub fn sum_range(&self, column: &str, first_row: u32, last_row: u32) -> Result<f64> {
        let mut total = 0.0;
        for row in first_row..=last_row {
            total += self.cell_value(&CellRef::new(column, row)?);
        }
        Ok(total)
    }

    pub fn sumproduct(&self, left: &CellRef, right: &CellRef, rows: u32) -> f64 {
        (0..rows)
            .map(|i| self.cell_value(&left.offset_rows(i)) * self.cell_value(&right.offset_rows(i)))
            .sum()
    }

    pub fn totals(&self) -> Result<Totals> {
        let quantity = self.sum_range(QUANTITY_COLUMN, QUANTITY_FIRST_ROW, QUANTITY_LAST_ROW)?;
        let quantities = CellRef::new(QUANTITY_COLUMN, QUANTITY_FIRST_ROW)?;
        let rows = QUANTITY_LAST_ROW - QUANTITY_FIRST_ROW + 1;

        let mut nutrients = HashMap::with_capacity(COMPOSITION_COLUMNS.len());
        for column in COMPOSITION_COLUMNS {
            let composition = CellRef::new(column, COMPOSITION_FIRST_ROW)?;
            nutrients.insert(*column, self.sumproduct(&quantities, &composition, rows));
        }

        Ok(Totals {
            quantity,
            nutrients,
        })
    }

    /// Cost per kg of feed, `NA` when any submitted ingredient has no cost.
    fn cost_per_kg(&self, totals: &Totals) -> MetricValue {
        if self.request.ingredients.values().any(|i| i.cost <= 0.0) {
            return MetricValue::NotAvailable;
        }
        if totals.quantity == 0.0 {
            return MetricValue::NotAvailable;
        }
        let total_cost: f64 = self
            .request
            .ingredients
            .values()
            .map(|i| i.quantity * i.cost)
            .sum();
        MetricValue::Number(total_cost / totals.quantity)
    }

    pub fn calculate_all(&self) -> Result<CalculationResults> {
        let t = self.totals()?;
        let f1 = t.quantity;
        let per_f1 = |x: f64| ratio(x, f1);

        let crude_protein = t.per_kg("C");
        let energy = t.per_kg("F");
        let methionine = t.per_kg("K");
        let cystine = t.per_kg("L");
        let chloride_mg = t.per_kg("W");
        let sodium_mg = t.per_kg("X");
        let potassium_mg = t.per_kg("Y");
        let chloride_pct = chloride_mg / 10.0;
        let sodium_pct = sodium_mg / 10.0;

        let premix = self.quantity("K2");
        let bcomplex = self.quantity("K3");
        let dicerol = self.quantity("K6");
        let choline = self.quantity("K7");
        let biotin = self.quantity("K11");
        let vitamin_e = self.quantity("K12");

        let cost_per_kg = self.cost_per_kg(&t);
        let cost_per_bag = cost_per_kg.map(|c| c * BAG_WEIGHT_KG);
        let bag_price = self.cell_value(&CellRef::parse(BAG_PRICE_CELL)?);
        let margin = cost_per_bag.map(|c| bag_price - c);

        let n = MetricValue::Number;
        let mut results: CalculationResults = [
            ("Total Quantity", n(f1)),
            ("Cost per Bag", cost_per_bag),
            ("AFT", n(t.per_kg("E"))),
            ("Arginine (%)", n(t.per_kg("M"))),
            ("Available Phosphorus (%)", n(t.per_kg("I"))),
            ("B1", n(per_f1(bcomplex * 4.0))),
            ("B12", n(per_f1(bcomplex * 40.0))),
            ("B2", n(per_f1(premix * 50.0))),
            ("B6", n(per_f1(bcomplex * 8.0))),
            ("Biotin (mcg/kg)", n(per_f1(biotin * 0.02 * 1000.0 * 1000.0))),
            ("Calcium (%)", n(t.per_kg("G"))),
            ("Calorie:Protein Ratio", n(ratio(energy, crude_protein) * 1000.0)),
            ("Chloride (%)", n(chloride_pct)),
            ("Chloride (mg/kg)", n(chloride_mg)),
            ("Choline (mg/kg)", n(choline * 0.6)),
            ("Cobalt (mg/kg)", n(t.nutrient("AE") / 1000.0)),
            ("Copper (mg/kg)", n(t.per_kg("AD"))),
            ("Cost per kg", cost_per_kg),
            ("Crude Fibre (%)", n(t.per_kg("D"))),
            ("Crude Protein (%)", n(crude_protein)),
            ("Cystine (%)", n(cystine)),
            ("D3", n(per_f1(premix * 12000.0 + dicerol * 600000.0))),
            ("Folicacid", n(per_f1(bcomplex * 3.0))),
            ("Histidine", n(t.per_kg("N"))),
            ("Iodine (mg/kg)", n(t.nutrient("AF") / 1000.0)),
            ("Iron (mg/kg)", n(t.per_kg("AC"))),
            ("Isoleucine", n(t.per_kg("P"))),
            ("Leucine", n(t.per_kg("O"))),
            ("Linoleicacid", n(t.per_kg("AS"))),
            ("Lysine (%)", n(t.per_kg("J"))),
            ("Manganese (mg/kg)", n(t.per_kg("Z"))),
            ("Margin", margin),
            ("ME (Mcal/Kg)", n(energy)),
            ("Methionine (%)", n(methionine)),
            ("MET+CYS (%)", n(methionine + cystine)),
            (
                "Na+K-Cl (mEq/kg)",
                n((sodium_mg / 23.0 + potassium_mg / 39.0 - chloride_mg / 35.0) * 100.0),
            ),
            ("Na:Cl Ratio", n(ratio(chloride_pct, sodium_pct))),
            ("Na:K Ratio", n(ratio(potassium_mg, sodium_mg))),
            ("Niacin", n(per_f1(bcomplex * 60.0))),
            ("Panthothenicacid", n(per_f1(bcomplex * 40.0))),
            ("P.Alanine", n(t.per_kg("Q"))),
            ("Potassium (%)", n(potassium_mg / 10.0)),
            ("Potassium (mg/kg)", n(potassium_mg)),
            ("Selenium (mg/kg)", n(t.per_kg("AB"))),
            ("Serine", n(t.per_kg("V"))),
            ("Sodium (%)", n(sodium_pct)),
            ("Sodium (mg/kg)", n(sodium_mg)),
            ("Threonine", n(t.per_kg("R"))),
            ("Total Phosphorus (%)", n(t.per_kg("H"))),
            ("Tryoptophan", n(t.per_kg("S"))),
            ("Tyrosine", n(t.per_kg("T"))),
            ("Valine", n(t.per_kg("U"))),
            ("Vitamin A (IU/kg)", n(per_f1(premix * 82500.0))),
            ("Vitamin E (IU/kg)", n(per_f1(bcomplex * 40.0 + vitamin_e * 0.5 * 1000.0))),
            ("Vitamin K (mg/kg)", n(per_f1(premix * 10.0))),
            ("Zinc (mg/kg)", n(t.per_kg("AA"))),
        ]
        .into_iter()
        .collect();

        for value in results.values_mut() {
            *value = value.rounded();
        }

        tracing::debug!(
            "Calculated {} metrics for {} ingredients (total {} kg)",
            results.len(),
            self.request.ingredients.len(),
            f1
        );
        Ok(results)
    }
}
