use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::GridMixError;
use crate::simulation::SimulationError;

/// Errors returned from handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Upstream data could not be used
    #[error("Upstream error: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::BadGateway(_) => "BadGateway",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::BadGateway(_) => {
                tracing::warn!(error = %self, "upstream data unusable");
                self.to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.error_type().to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<GridMixError> for ApiError {
    fn from(error: GridMixError) -> Self {
        match error {
            GridMixError::NoData { .. } => ApiError::NotFound(error.to_string()),
            GridMixError::UnknownFuelType(_)
            | GridMixError::MalformedRow(_)
            | GridMixError::Upstream { .. }
            | GridMixError::Pagination { .. }
            | GridMixError::Http(_) => ApiError::BadGateway(error.to_string()),
            GridMixError::Cache(_) => ApiError::InternalError(error.to_string()),
        }
    }
}

impl From<SimulationError> for ApiError {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::InvalidHome { .. } => ApiError::ValidationError(error.to_string()),
            SimulationError::EmptyWeather
            | SimulationError::NoScenarios
            | SimulationError::InvalidWeather(_) => ApiError::BadRequest(error.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}
