// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for admission and artifact lifecycle.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Service metrics, registered on a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub gate_decisions: IntCounterVec,
    pub bans: IntCounter,
    pub artifacts_published: IntCounter,
    pub artifacts_evicted: IntCounter,
    pub conversions_failed: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let gate_decisions = IntCounterVec::new(
            Opts::new("gate_decisions_total", "Request gate outcomes"),
            &["outcome"],
        )?;
        let bans = IntCounter::new("bans_total", "Clients banned for bursting")?;
        let artifacts_published =
            IntCounter::new("artifacts_published_total", "Images published to the static dir")?;
        let artifacts_evicted =
            IntCounter::new("artifacts_evicted_total", "Published images removed by eviction")?;
        let conversions_failed =
            IntCounter::new("conversions_failed_total", "Conversions that failed in an external tool")?;

        registry.register(Box::new(gate_decisions.clone()))?;
        registry.register(Box::new(bans.clone()))?;
        registry.register(Box::new(artifacts_published.clone()))?;
        registry.register(Box::new(artifacts_evicted.clone()))?;
        registry.register(Box::new(conversions_failed.clone()))?;

        Ok(Self {
            registry,
            gate_decisions,
            bans,
            artifacts_published,
            artifacts_evicted,
            conversions_failed,
        })
    }

    /// Render all metrics in the text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.gate_decisions.with_label_values(&["allow"]).inc();
        metrics.bans.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("gate_decisions_total{outcome=\"allow\"} 1"));
        assert!(text.contains("bans_total 1"));
    }
}
