// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client request ledger.
//!
//! `ClientHistory` is a plain timestamp queue with lazy pruning. The
//! `ClientStore` trait hides how records are shared between workers; the
//! default `ShardedClientStore` keeps one record per client in a sharded
//! concurrent map so that every read-modify-write on a client runs under
//! that client's entry lock.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Identifies the requesting client (its network address).
pub type ClientKey = String;

/// Ordered request timestamps for a single client.
#[derive(Debug, Default, Clone)]
pub struct ClientHistory {
    timestamps: VecDeque<Instant>,
}

impl ClientHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp `t` with `now - t >= window`.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Append a request instant, clamped so the ledger never goes backwards.
    pub fn record(&mut self, now: Instant) {
        let at = match self.timestamps.back() {
            Some(&last) if last > now => last,
            _ => now,
        };
        self.timestamps.push_back(at);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Oldest request still in the ledger.
    pub fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }

    /// Most recent recorded request.
    pub fn latest(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }
}

/// Everything the admission controller tracks for one client.
#[derive(Debug, Default, Clone)]
pub struct ClientRecord {
    pub history: ClientHistory,
    /// Ban expiry; the client is banned while `now < banned_until`.
    pub banned_until: Option<Instant>,
}

impl ClientRecord {
    /// Whether an unexpired ban covers `now`. Clears a lapsed ban.
    pub fn check_ban(&mut self, now: Instant) -> Option<Instant> {
        match self.banned_until {
            Some(until) if now < until => Some(until),
            Some(_) => {
                self.banned_until = None;
                None
            }
            None => None,
        }
    }

    /// True once the record carries no live state and may be dropped.
    pub fn is_idle(&self, now: Instant, window: Duration) -> bool {
        let history_idle = match self.history.latest() {
            Some(latest) => now.saturating_duration_since(latest) >= window,
            None => true,
        };
        let ban_idle = self.banned_until.map_or(true, |until| now >= until);
        history_idle && ban_idle
    }
}

/// Concurrency-safe storage of client records.
///
/// `with_record` must run its closure with exclusive access to that client's
/// record for the whole call.
pub trait ClientStore: Send + Sync {
    /// Run `f` against the record for `key`, creating an empty one if needed.
    fn with_record<R>(&self, key: &str, f: impl FnOnce(&mut ClientRecord) -> R) -> R;

    /// Keep only the records for which `keep` returns true.
    fn retain(&self, keep: impl FnMut(&str, &mut ClientRecord) -> bool);

    /// Number of tracked clients.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `DashMap`-backed store; locking is per shard, not global.
#[derive(Debug, Default)]
pub struct ShardedClientStore {
    records: DashMap<ClientKey, ClientRecord>,
}

impl ShardedClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStore for ShardedClientStore {
    fn with_record<R>(&self, key: &str, f: impl FnOnce(&mut ClientRecord) -> R) -> R {
        if let Some(mut record) = self.records.get_mut(key) {
            return f(record.value_mut());
        }
        let mut record = self.records.entry(key.to_string()).or_default();
        f(record.value_mut())
    }

    fn retain(&self, mut keep: impl FnMut(&str, &mut ClientRecord) -> bool) {
        self.records.retain(|key, record| keep(key, record));
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
