// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pre-handler request gate.
//!
//! Admission runs first for all traffic, so banned scanners stay banned;
//! the path classifier runs second. Every rejection is terminal.

use crate::admission::{AdmissionController, BlockReason, Decision};
use crate::classifier::SuspiciousPathSet;
use crate::error::{not_found, ErrorResponse};
use crate::handlers::AppState;
use crate::history::{ClientStore, ShardedClientStore};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of running a request through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Hand the request to the business handler
    Proceed,
    /// Answer immediately
    Reject(Rejection),
}

/// Terminal gate rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    HardBlock {
        reason: BlockReason,
        retry_after: Duration,
    },
    SoftLimit { retry_after: Duration },
    PathMatch,
}

impl Rejection {
    /// Metric label for this rejection.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HardBlock { .. } => "hard_block",
            Self::SoftLimit { .. } => "soft_limit",
            Self::PathMatch => "path_match",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (message, code, retry_after) = match self {
            Rejection::PathMatch => return not_found(),
            Rejection::HardBlock { retry_after, .. } => (
                "Rate limit exceeded. Please try again later.",
                "RATE_LIMITED",
                retry_after,
            ),
            Rejection::SoftLimit { retry_after } => (
                "Too many requests. Please slow down.",
                "SLOW_DOWN",
                retry_after,
            ),
        };
        // Round up so clients never retry before the limit lifts.
        let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_secs.to_string())],
            Json(ErrorResponse {
                error: message.to_string(),
                code,
                retry_after_secs: Some(retry_secs),
            }),
        )
            .into_response()
    }
}

/// Admission controller and path classifier composed into one check.
pub struct RequestGate<S = ShardedClientStore> {
    admission: AdmissionController<S>,
    classifier: SuspiciousPathSet,
}

impl<S: ClientStore> RequestGate<S> {
    pub fn new(admission: AdmissionController<S>, classifier: SuspiciousPathSet) -> Self {
        Self {
            admission,
            classifier,
        }
    }

    pub fn admission(&self) -> &AdmissionController<S> {
        &self.admission
    }

    pub fn classifier(&self) -> &SuspiciousPathSet {
        &self.classifier
    }

    /// Decide what happens to a request from `client` for `path` at `now`.
    pub fn evaluate(&self, client: &str, path: &str, now: Instant) -> GateOutcome {
        match self.admission.decide(client, now) {
            Decision::HardBlock {
                reason,
                retry_after,
            } => GateOutcome::Reject(Rejection::HardBlock {
                reason,
                retry_after,
            }),
            Decision::SoftLimit { retry_after } => {
                GateOutcome::Reject(Rejection::SoftLimit { retry_after })
            }
            Decision::Allow if self.classifier.is_suspicious(path) => {
                GateOutcome::Reject(Rejection::PathMatch)
            }
            Decision::Allow => GateOutcome::Proceed,
        }
    }
}

/// Axum middleware running every request through the gate.
pub async fn gate_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let client = addr.ip().to_string();
    let path = request.uri().path().to_owned();
    let outcome = state.gate.evaluate(&client, &path, Instant::now());

    match outcome {
        GateOutcome::Proceed => {
            state.metrics.gate_decisions.with_label_values(&["allow"]).inc();
            next.run(request).await
        }
        GateOutcome::Reject(rejection) => {
            state
                .metrics
                .gate_decisions
                .with_label_values(&[rejection.label()])
                .inc();
            if let Rejection::HardBlock {
                reason: BlockReason::BurstBan,
                ..
            } = rejection
            {
                state.metrics.bans.inc();
            }
            debug!(client = %client, path = %path, outcome = rejection.label(), "Request rejected at gate");
            rejection.into_response()
        }
    }
}
