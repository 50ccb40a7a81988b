use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Catalog parsing error: {0}")]
    CatalogError(#[from] toml::de::Error),

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid cell reference: {reference}")]
    CellReferenceError { reference: String },

    #[error("Template error in {template}: {message}")]
    TemplateError { template: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        details: Vec<String>,
    },

    #[error("Request exceeded the {seconds}s timeout")]
    RequestTimeout { seconds: u64 },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Request,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidConfigValueError { .. } | AppError::CatalogError(_) => {
                ErrorCategory::Configuration
            }
            AppError::CsvError(_)
            | AppError::CellReferenceError { .. }
            | AppError::TemplateError { .. } => ErrorCategory::Data,
            AppError::ValidationError { .. } | AppError::RequestTimeout { .. } => {
                ErrorCategory::Request
            }
            AppError::IoError(_) | AppError::ServerError { .. } => ErrorCategory::Runtime,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::ValidationError { .. } | AppError::CellReferenceError { .. } => {
                ErrorSeverity::Low
            }
            AppError::RequestTimeout { .. } => ErrorSeverity::Medium,
            AppError::InvalidConfigValueError { .. }
            | AppError::CatalogError(_)
            | AppError::CsvError(_)
            | AppError::TemplateError { .. } => ErrorSeverity::High,
            AppError::IoError(_) | AppError::ServerError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AppError::InvalidConfigValueError { .. } => {
                "Check the command line flags and the PORT environment variable"
            }
            AppError::CatalogError(_) => "The embedded ingredient catalog is malformed; rebuild the binary",
            AppError::CsvError(_) => "Make sure converted_file.csv is a valid CSV export of the sheet",
            AppError::TemplateError { .. } => "Make sure the templates directory contains index.html and error.html",
            AppError::CellReferenceError { .. } => "Use A1-style references such as B2 or AA43",
            AppError::ValidationError { .. } => "Fix the listed ingredient values and submit again",
            AppError::RequestTimeout { .. } => "Retry the request; the server keeps serving other requests",
            AppError::IoError(_) => "Check file permissions and that the port is not already in use",
            AppError::ServerError { .. } => "Restart the service; the orchestrator owns restarts",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting `{}`: {}", field, reason)
            }
            AppError::TemplateError { template, .. } => {
                format!("Could not load template `{}`", template)
            }
            AppError::ValidationError { message, .. } => message.clone(),
            AppError::RequestTimeout { .. } => "The request took too long and was cancelled".to_string(),
            AppError::IoError(e) => format!("System I/O failure: {}", e),
            other => other.to_string(),
        }
    }

    /// Process exit code for start-time failures.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } | AppError::CellReferenceError { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::ValidationError { message, details } if details.is_empty() => {
                json!({ "error": message })
            }
            AppError::ValidationError { message, details } => {
                json!({ "error": message, "details": details })
            }
            AppError::RequestTimeout { .. } => json!({
                "error": "Request timed out",
                "details": self.to_string(),
            }),
            other => json!({
                "error": "An unexpected error occurred",
                "details": other.to_string(),
            }),
        };
        if status.is_server_error() {
            tracing::error!(
                "Request failed: {} (Category: {:?}, Severity: {:?})",
                self,
                self.category(),
                self.severity()
            );
        }
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
