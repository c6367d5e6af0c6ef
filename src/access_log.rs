// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Access log with scanner noise filtered out.
//!
//! A 404 for a suspicious path is the expected answer to a scanner and is not
//! worth a log line. Everything else, including 404s for ordinary paths, is.

use crate::classifier::SuspiciousPathSet;
use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Decides which completed requests reach the access log.
#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    suspicious: SuspiciousPathSet,
}

impl AccessLogFilter {
    pub fn new(suspicious: SuspiciousPathSet) -> Self {
        Self { suspicious }
    }

    pub fn should_log(&self, path: &str, status: StatusCode) -> bool {
        !(status == StatusCode::NOT_FOUND && self.suspicious.is_suspicious(path))
    }
}

/// Axum middleware emitting one access log event per logged request.
pub async fn access_log_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let status = response.status();
    if state.access_log.should_log(&path, status) {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    }
    response
}
