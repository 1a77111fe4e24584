use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::rasterize::ConversionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant is terminal for the current request and none is fatal to
/// the process: the page stays interactive for the next attempt.
#[derive(Debug, Error)]
pub enum AppError {
    /// A trigger was pressed without an uploaded resume. Rendered as a
    /// warning on the page; neither the rasterizer nor the model runs.
    #[error("Please upload a PDF resume to analyze.")]
    NoFileProvided,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Error processing PDF: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NoFileProvided => (StatusCode::BAD_REQUEST, "NO_FILE", self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conversion(e) => {
                tracing::warn!("PDF conversion failed: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "CONVERSION_ERROR",
                    self.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
