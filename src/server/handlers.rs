use crate::core::calculator::Calculator;
use crate::domain::model::{CalculationResponse, HealthReport};
use crate::server::templates::{escape_html, ERROR_TEMPLATE, INDEX_TEMPLATE};
use crate::server::AppState;
use crate::utils::error::{AppError, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::collections::HashMap;

const CSV_MISSING_MESSAGE: &str = "CSV file not loaded. Please ensure converted_file.csv exists.";

pub async fn index(State(state): State<AppState>) -> Result<Response> {
    if !state.sheet.is_loaded() {
        let values = HashMap::from([("message", escape_html(CSV_MISSING_MESSAGE))]);
        let page = state.templates.render(ERROR_TEMPLATE, &values)?;
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response());
    }

    let rows: String = state
        .catalog
        .ingredients()
        .into_iter()
        .map(|(cell, label)| {
            let cell = escape_html(cell);
            let label = escape_html(label);
            format!(
                concat!(
                    "<tr data-cell=\"{cell}\">",
                    "<td><label for=\"qty-{cell}\">{label}</label></td>",
                    "<td><input type=\"number\" id=\"qty-{cell}\" name=\"{cell}-quantity\" min=\"0\" step=\"any\"></td>",
                    "<td><input type=\"number\" id=\"cost-{cell}\" name=\"{cell}-cost\" min=\"0\" step=\"any\"></td>",
                    "</tr>\n"
                ),
                cell = cell,
                label = label
            )
        })
        .collect();

    let values = HashMap::from([
        ("ingredient_rows", rows),
        ("ingredient_count", state.catalog.len().to_string()),
    ]);
    let page = state.templates.render(INDEX_TEMPLATE, &values)?;
    Ok(Html(page).into_response())
}

pub async fn calculate(State(state): State<AppState>, body: Bytes) -> Result<Json<CalculationResponse>> {
    // Unparseable bodies are treated like empty ones.
    let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!("Ignoring unparseable request body: {}", e);
        Value::Null
    });
    let request = state.catalog.validate_request(&payload)?;

    let results = Calculator::new(&state.sheet, &state.catalog, &request)
        .calculate_all()
        .map_err(|e| AppError::ServerError {
            message: e.to_string(),
        })?;

    Ok(Json(CalculationResponse {
        success: true,
        results,
        timestamp: chrono::Local::now().to_rfc3339(),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy",
        csv_loaded: state.sheet.is_loaded(),
        csv_rows: state.sheet.row_count(),
        ingredients_count: state.catalog.len(),
        workers: state.pool.snapshot(),
    })
}
