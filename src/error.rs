// src/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::calendar::PeriodError;
use crate::export::ExportError;
use crate::feeds::FeedError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(#[from] PeriodError),
    #[error("Data feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Error occurred: {:?}", self);
        let (status_code, message) = match &self {
            AppError::InvalidPeriod(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Feed(FeedError::InvalidPeriod(period)) => (
                StatusCode::BAD_REQUEST,
                format!("Period {} has no valid date range", period),
            ),
            AppError::Feed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load planning data.".to_string(),
            ),
            AppError::Export(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate the export file.".to_string(),
            ),
        };
        (status_code, Json(json!({ "error": message }))).into_response()
    }
}
