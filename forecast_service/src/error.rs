use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forecast_engine::ForecastError;
use serde_json::json;
use thiserror::Error;

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] ForecastError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Email is required")]
    MissingEmail,

    #[error("Invalid email format")]
    InvalidEmail(String),

    #[error("No forecast available")]
    NoForecast,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingEmail | ServiceError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            ServiceError::NoForecast => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
