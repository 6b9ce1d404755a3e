//! HTTP-facing error envelope.
//!
//! REST handlers return [`AppError`]; the response is a JSON body naming
//! the failed stage, mirroring the shape of the WebSocket `error` event.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::core::pipeline::PipelineError;

/// Errors surfaced through the REST API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request payload failed validation before reaching the pipeline
    #[error("{0}")]
    InvalidInput(String),

    /// The pipeline failed while answering the query
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, stage, message) = match &self {
            AppError::InvalidInput(message) => {
                (StatusCode::BAD_REQUEST, "input", message.clone())
            }
            AppError::Pipeline(error) => {
                let status = match error {
                    PipelineError::InputRejected(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, error.stage(), error.to_string())
            }
        };

        (status, Json(json!({ "error": message, "stage": stage }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
