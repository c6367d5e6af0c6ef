// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Attack simulation patterns for security testing.

use std::time::Duration;

/// Attack pattern configuration.
///
/// Requests are issued on a simulated clock, `interval` apart, cycling
/// through `unique_ips` clients.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated time between consecutive requests
    pub interval: Duration,
    /// Number of unique IPs to simulate
    pub unique_ips: usize,
    /// Fraction of requests aimed at scanner paths (0.0-1.0)
    pub scanner_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval: Duration::from_millis(100),
            unique_ips: 1,
            scanner_ratio: 0.0,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single IP flood - simulates basic DoS from one source.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 500,
            interval: Duration::from_millis(10),
            unique_ips: 1,
            ..Default::default()
        }
    }

    /// Distributed attack - many IPs, low rate each.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 1000,
            interval: Duration::from_millis(20),
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// Vulnerability scanner sweeping well-known paths.
    pub fn scanner_sweep() -> Self {
        Self {
            total_requests: 200,
            interval: Duration::from_millis(50),
            unique_ips: 1,
            scanner_ratio: 1.0,
        }
    }

    /// Scanner spread across many addresses, each staying under the limit.
    pub fn distributed_scanner() -> Self {
        Self {
            total_requests: 300,
            interval: Duration::from_millis(50),
            unique_ips: 50,
            scanner_ratio: 1.0,
        }
    }

    /// Slow drip - stay under the strict limit.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 100,
            interval: Duration::from_secs(4), // 15 per minute < 20
            unique_ips: 1,
            ..Default::default()
        }
    }

    /// Simulated length of the attack.
    pub fn simulated_duration(&self) -> Duration {
        self.interval * self.total_requests as u32
    }
}
