// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Slide Gate
//!
//! A slide deck to JPEG conversion service whose ingress is guarded by an
//! admission subsystem and whose storage is strictly ephemeral:
//!
//! - Sliding-window rate limiting per client IP (60s window)
//! - Temporary bans for bursting clients (20 requests / window, 30 min ban)
//! - Suspicious path filtering for scanner traffic (generic 404)
//! - Access logging that drops scanner noise
//! - Per-request workspaces removed on every exit path
//! - Published images evicted after a retention window (1 hour)

pub mod access_log;
pub mod admission;
pub mod classifier;
pub mod config;
pub mod convert;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod history;
pub mod metrics;
pub mod retention;
pub mod workspace;

pub use access_log::AccessLogFilter;
pub use admission::{AdmissionController, BlockReason, Decision};
pub use classifier::{PathPattern, SuspiciousPathSet};
pub use config::Config;
pub use gate::{GateOutcome, Rejection, RequestGate};
pub use retention::{ArtifactRetentionScheduler, PublishedArtifactSet};
pub use workspace::{Workspace, WorkspaceManager};
