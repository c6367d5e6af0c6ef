// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window admission controller.
//!
//! Each decision runs under the client's record lock:
//! 1. An unexpired ban rejects outright without touching the history.
//! 2. Timestamps older than the window are pruned.
//! 3. The current request is counted; reaching `strict_max` bans the client,
//!    reaching `soft_max` rejects without a ban.
//! 4. Otherwise the request is recorded and allowed.
//!
//! A limit of zero disables that check.

use crate::config::AdmissionConfig;
use crate::history::{ClientStore, ShardedClientStore};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request may proceed
    Allow,
    /// Too many requests in the window; rejected without a ban
    SoftLimit {
        /// Time until the oldest counted request leaves the window
        retry_after: Duration,
    },
    /// Client is banned, either already or as a result of this request
    HardBlock {
        reason: BlockReason,
        /// Time until the ban expires
        retry_after: Duration,
    },
}

/// Why a request was hard-blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// An earlier ban is still in force
    Banned,
    /// This request crossed the strict threshold and started a ban
    BurstBan,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Banned => write!(f, "client is temporarily banned"),
            Self::BurstBan => write!(f, "burst threshold crossed, ban applied"),
        }
    }
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Thread-safe admission controller over a shared client store.
pub struct AdmissionController<S = ShardedClientStore> {
    config: AdmissionConfig,
    store: S,
}

impl AdmissionController<ShardedClientStore> {
    /// Create a controller backed by the default sharded store.
    pub fn new(config: AdmissionConfig) -> Self {
        Self::with_store(config, ShardedClientStore::new())
    }
}

impl<S: ClientStore> AdmissionController<S> {
    pub fn with_store(config: AdmissionConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Decide whether a request from `key` arriving at `now` is admitted.
    pub fn decide(&self, key: &str, now: Instant) -> Decision {
        let window = self.config.window();
        let ban = self.config.ban_duration();
        let strict_max = self.config.strict_max;
        let soft_max = self.config.soft_max;

        let decision = self.store.with_record(key, |record| {
            if let Some(until) = record.check_ban(now) {
                return Decision::HardBlock {
                    reason: BlockReason::Banned,
                    retry_after: until.saturating_duration_since(now),
                };
            }

            record.history.prune(now, window);
            let count = record.history.len() + 1;

            if strict_max > 0 && count >= strict_max {
                record.banned_until = Some(now + ban);
                return Decision::HardBlock {
                    reason: BlockReason::BurstBan,
                    retry_after: ban,
                };
            }

            if soft_max > 0 && count >= soft_max {
                let retry_after = record
                    .history
                    .oldest()
                    .map(|oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                    .unwrap_or(window);
                return Decision::SoftLimit { retry_after };
            }

            record.history.record(now);
            Decision::Allow
        });

        match decision {
            Decision::HardBlock {
                reason: BlockReason::BurstBan,
                retry_after,
            } => {
                warn!(client = %key, ban_secs = retry_after.as_secs(), "Strict threshold crossed, client banned");
            }
            Decision::HardBlock { retry_after, .. } => {
                debug!(client = %key, ?retry_after, "Banned client rejected");
            }
            Decision::SoftLimit { retry_after } => {
                debug!(client = %key, ?retry_after, "Soft limit reached");
            }
            Decision::Allow => {}
        }

        decision
    }

    /// Ban expiry for `key`, if a ban is in force at `now`.
    pub fn ban_expiry(&self, key: &str, now: Instant) -> Option<Instant> {
        self.store.with_record(key, |record| record.check_ban(now))
    }

    /// Drop records with no live history and no active ban.
    ///
    /// Returns the number of clients still tracked.
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.config.window();
        let before = self.store.len();
        self.store.retain(|_, record| {
            record.check_ban(now);
            !record.is_idle(now, window)
        });
        let after = self.store.len();
        if before != after {
            debug!(removed = before - after, tracked = after, "Swept idle clients");
        }
        after
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}
