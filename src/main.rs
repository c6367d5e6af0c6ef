// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Slide Gate Service
//!
//! Accepts slide deck uploads, converts them to JPEG images with LibreOffice
//! and ImageMagick, and serves the images under `/static` for a limited time.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8000)
//! - `STATIC_DIR`: Public image directory (default: /app/static)
//! - `WORK_DIR`: Parent of per-request workspaces (default: OS temp dir)
//! - `RETENTION_SECS`: Published image lifetime (default: 3600)
//! - `WINDOW_SECS`: Admission window (default: 60)
//! - `SOFT_MAX`: Requests per window before soft rejection (default: 100)
//! - `STRICT_MAX`: Requests per window before a ban (default: 20)
//! - `BAN_SECS`: Ban length (default: 1800)
//! - `CONVERT_TIMEOUT_SECS`: Per-tool timeout (default: 300)
//! - `DEBUG_ENDPOINTS`: Mount /debug/static routes (default: false)
//! - `METRICS_ENABLED`: Serve /metrics (default: true)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slide_gate::{
    config::Config,
    convert::CommandRenderer,
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        static_dir = %config.storage.static_dir.display(),
        window_secs = config.admission.window_secs,
        soft_max = config.admission.soft_max,
        strict_max = config.admission.strict_max,
        ban_secs = config.admission.ban_secs,
        retention_secs = config.storage.retention_secs,
        "Starting slide gate"
    );

    tokio::fs::create_dir_all(&config.storage.static_dir).await?;

    let renderer = Arc::new(CommandRenderer::new(config.conversion.clone()));
    let state = Arc::new(AppState::new(config.clone(), renderer)?);

    // Spawn sweep task for idle admission records
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let tracked = sweep_state.gate.admission().sweep(Instant::now());
            debug!(tracked, "Admission sweep finished");
        }
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let defaults = Config::default();
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        admission: slide_gate::config::AdmissionConfig {
            window_secs: env_or("WINDOW_SECS", defaults.admission.window_secs),
            soft_max: env_or("SOFT_MAX", defaults.admission.soft_max),
            strict_max: env_or("STRICT_MAX", defaults.admission.strict_max),
            ban_secs: env_or("BAN_SECS", defaults.admission.ban_secs),
        },
        storage: slide_gate::config::StorageConfig {
            static_dir: env_or::<PathBuf>("STATIC_DIR", defaults.storage.static_dir),
            work_dir: env_or::<PathBuf>("WORK_DIR", defaults.storage.work_dir),
            retention_secs: env_or("RETENTION_SECS", defaults.storage.retention_secs),
        },
        conversion: slide_gate::config::ConversionConfig {
            timeout_secs: env_or("CONVERT_TIMEOUT_SECS", defaults.conversion.timeout_secs),
            ..defaults.conversion
        },
        metrics: slide_gate::config::MetricsConfig {
            enabled: env_or("METRICS_ENABLED", defaults.metrics.enabled),
            ..defaults.metrics
        },
        debug_endpoints: env_or("DEBUG_ENDPOINTS", defaults.debug_endpoints),
    }
}
