// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Publishing of rendered slides and their delayed eviction.
//!
//! Published images outlive the request that produced them. Eviction is a
//! detached one-shot task that is not tied to the request and cannot be
//! cancelled by a client disconnect. Deleting an already missing file is a
//! no-op. A publish that is itself dropped part way arms eviction for
//! whatever it had started copying.

use prometheus::IntCounter;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to prepare public directory {path}: {source}")]
    PublicDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A batch of files published by one conversion.
#[derive(Debug, Clone)]
pub struct PublishedArtifactSet {
    pub session_id: String,
    /// Public-relative addresses, in slide order.
    pub urls: Vec<String>,
    pub published_at: Instant,
}

/// Copies files into the public directory and schedules their removal.
#[derive(Debug, Clone)]
pub struct ArtifactRetentionScheduler {
    public_dir: PathBuf,
    url_prefix: String,
    evicted: Option<IntCounter>,
}

impl ArtifactRetentionScheduler {
    /// `url_prefix` is the route the public directory is served under,
    /// e.g. `/static`.
    pub fn new(public_dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            public_dir: public_dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            evicted: None,
        }
    }

    /// Count successful evictions on `counter`.
    pub fn with_eviction_counter(mut self, counter: IntCounter) -> Self {
        self.evicted = Some(counter);
        self
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Copy `files` into the public directory as `{session}_{NNN}.jpg`,
    /// numbered from 1 in the given order, and arm their eviction after `ttl`.
    ///
    /// Every target is registered for eviction before its copy starts, so a
    /// publish that is dropped part way still leaves nothing behind for good.
    pub async fn publish(
        &self,
        files: &[PathBuf],
        ttl: Duration,
    ) -> Result<PublishedArtifactSet, PublishError> {
        tokio::fs::create_dir_all(&self.public_dir)
            .await
            .map_err(|source| PublishError::PublicDir {
                path: self.public_dir.clone(),
                source,
            })?;

        let session_id = session_id();
        let mut pending = PendingEviction::new(ttl, self.evicted.clone());
        let mut urls = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            let name = artifact_name(&session_id, index + 1);
            let target = self.public_dir.join(&name);
            pending.paths.push(target.clone());

            if let Err(source) = copy_public(file, &target).await {
                for path in &pending.paths {
                    let _ = tokio::fs::remove_file(path).await;
                }
                pending.disarm();
                return Err(PublishError::Copy {
                    from: file.clone(),
                    to: target,
                    source,
                });
            }

            debug!(from = %file.display(), to = %target.display(), "Artifact published");
            urls.push(format!("{}/{}", self.url_prefix, name));
        }

        drop(pending.arm());
        info!(
            session_id = %session_id,
            count = urls.len(),
            ttl_secs = ttl.as_secs(),
            "Published artifact set"
        );
        Ok(PublishedArtifactSet {
            session_id,
            urls,
            published_at: Instant::now(),
        })
    }

    /// Schedule deletion of each published file once `ttl` has elapsed.
    ///
    /// The returned handle may be dropped; the task keeps running.
    pub fn arm_eviction(&self, urls: &[String], ttl: Duration) -> JoinHandle<()> {
        let paths: Vec<PathBuf> = urls
            .iter()
            .filter_map(|url| self.resolve(url))
            .collect();

        debug!(count = paths.len(), ttl_secs = ttl.as_secs(), "Eviction armed");
        tokio::spawn(evict(paths, ttl, self.evicted.clone()))
    }

    /// Map a public URL back to a file in the public directory. Only the
    /// final path segment is used, and anything that could escape the
    /// directory is refused.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let name = url.rsplit('/').next()?;
        if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
            warn!(url = %url, "Refusing to evict unexpected artifact URL");
            return None;
        }
        Some(self.public_dir.join(name))
    }
}

/// Files copied (or being copied) by an unfinished publish. Unless disarmed,
/// dropping it schedules their eviction.
struct PendingEviction {
    paths: Vec<PathBuf>,
    ttl: Duration,
    evicted: Option<IntCounter>,
    settled: bool,
}

impl PendingEviction {
    fn new(ttl: Duration, evicted: Option<IntCounter>) -> Self {
        Self {
            paths: Vec::new(),
            ttl,
            evicted,
            settled: false,
        }
    }

    fn arm(mut self) -> JoinHandle<()> {
        self.settled = true;
        let paths = std::mem::take(&mut self.paths);
        debug!(count = paths.len(), ttl_secs = self.ttl.as_secs(), "Eviction armed");
        tokio::spawn(evict(paths, self.ttl, self.evicted.clone()))
    }

    /// The caller already removed the files.
    fn disarm(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingEviction {
    fn drop(&mut self) {
        if self.settled || self.paths.is_empty() {
            return;
        }
        let paths = std::mem::take(&mut self.paths);
        warn!(count = paths.len(), "Publish interrupted, arming eviction for partial set");
        match Handle::try_current() {
            Ok(handle) => {
                drop(handle.spawn(evict(paths, self.ttl, self.evicted.clone())));
            }
            Err(_) => {
                for path in paths {
                    let _ = std::fs::remove_file(path);
                }
            }
        }
    }
}

async fn evict(paths: Vec<PathBuf>, ttl: Duration, evicted: Option<IntCounter>) {
    tokio::time::sleep(ttl).await;
    for path in paths {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Artifact evicted");
                if let Some(counter) = &evicted {
                    counter.inc();
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Artifact already gone");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to evict artifact");
            }
        }
    }
}

fn session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn artifact_name(session_id: &str, sequence: usize) -> String {
    format!("{}_{:03}.jpg", session_id, sequence)
}

async fn copy_public(from: &Path, to: &Path) -> io::Result<()> {
    tokio::fs::copy(from, to).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(to, std::fs::Permissions::from_mode(0o644)).await?;
    }
    Ok(())
}
