// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types and their HTTP rendering.

use crate::convert::ConvertError;
use crate::retention::PublishError;
use crate::workspace::WorkspaceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Failures surfaced by the conversion endpoint.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    #[error("Publishing failed: {0}")]
    Publish(#[from] PublishError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.to_string()),
            AppError::Multipart(_) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Malformed upload".to_string(),
            ),
            AppError::Conversion(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONVERSION_FAILED",
                "Conversion failed".to_string(),
            ),
            AppError::Workspace(_) | AppError::Publish(_) | AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An unexpected error occurred during conversion".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error = %self, code, "Request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: message,
                code,
                retry_after_secs: None,
            }),
        )
            .into_response()
    }
}

/// Generic 404, shared by the router fallback, the static file service and
/// the path classifier so that all three look the same.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not Found".to_string(),
            code: "NOT_FOUND",
            retry_after_secs: None,
        }),
    )
        .into_response()
}

pub async fn fallback() -> Response {
    not_found()
}
