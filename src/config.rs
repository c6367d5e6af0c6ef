// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the slide conversion gateway.
//!
//! Defaults are the reference admission and retention constants; the service
//! reads overrides from the environment at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the slide conversion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Admission control configuration
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Workspace and public artifact storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// External conversion tools
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Mount the /debug/static inspection routes (default: false)
    #[serde(default)]
    pub debug_endpoints: bool,
}

/// Sliding-window admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Sliding window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Requests per window that earn a soft rejection (default: 100)
    #[serde(default = "default_soft_max")]
    pub soft_max: usize,

    /// Requests per window that earn a ban (default: 20)
    #[serde(default = "default_strict_max")]
    pub strict_max: usize,

    /// Ban length in seconds (default: 1800)
    #[serde(default = "default_ban_secs")]
    pub ban_secs: u64,
}

/// Storage locations and published artifact lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory served under `/static` (default: /app/static)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Parent directory for per-request workspaces (default: OS temp dir)
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Seconds a published image stays available (default: 3600)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

/// External renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Office suite binary (default: soffice)
    #[serde(default = "default_soffice_bin")]
    pub soffice_bin: String,

    /// ImageMagick binary (default: convert)
    #[serde(default = "default_convert_bin")]
    pub convert_bin: String,

    /// Per-tool timeout in seconds (default: 300)
    #[serde(default = "default_convert_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest accepted upload in bytes (default: 100 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_window_secs() -> u64 {
    60
}

fn default_soft_max() -> usize {
    100
}

fn default_strict_max() -> usize {
    20
}

fn default_ban_secs() -> u64 {
    1800 // 30 minutes
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("/app/static")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_retention_secs() -> u64 {
    3600 // 1 hour
}

fn default_soffice_bin() -> String {
    "soffice".to_string()
}

fn default_convert_bin() -> String {
    "convert".to_string()
}

fn default_convert_timeout_secs() -> u64 {
    300
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            admission: AdmissionConfig::default(),
            storage: StorageConfig::default(),
            conversion: ConversionConfig::default(),
            metrics: MetricsConfig::default(),
            debug_endpoints: false,
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            soft_max: default_soft_max(),
            strict_max: default_strict_max(),
            ban_secs: default_ban_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            work_dir: default_work_dir(),
            retention_secs: default_retention_secs(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            soffice_bin: default_soffice_bin(),
            convert_bin: default_convert_bin(),
            timeout_secs: default_convert_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl AdmissionConfig {
    /// Get the sliding window duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the ban duration
    pub fn ban_duration(&self) -> Duration {
        Duration::from_secs(self.ban_secs)
    }
}

impl StorageConfig {
    /// Get the retention window for published images
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
