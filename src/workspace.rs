// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-request scratch directories.
//!
//! `WorkspaceManager::acquire` creates a fresh directory named by a random
//! UUID. The returned `Workspace` removes it on `release` or, failing that,
//! when dropped, so every exit path of a handler cleans up. Dropping inside
//! the runtime hands the delete to the blocking pool.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use uuid::Uuid;

const WORKSPACE_PREFIX: &str = "slide-gate-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Allocates workspaces under a common parent directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a new, exclusively owned workspace directory.
    pub async fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        let id = Uuid::new_v4();
        let path = self
            .root
            .join(format!("{}{}", WORKSPACE_PREFIX, id.simple()));

        let create = |source| WorkspaceError::Create {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.root).await.map_err(create)?;
        // create_dir, not create_dir_all: an existing directory is an error.
        tokio::fs::create_dir(&path).await.map_err(create)?;

        debug!(workspace = %path.display(), "Workspace acquired");
        Ok(Workspace {
            id,
            path,
            released: false,
        })
    }
}

/// A scratch directory owned by one request.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of an entry inside the workspace.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Recursively delete the workspace. Safe to call more than once;
    /// missing entries are ignored and other failures are only logged.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        let result = tokio::fs::remove_dir_all(&self.path).await;
        // Only settled once the delete finished; a cancelled release falls
        // back to `Drop`.
        self.released = true;
        log_removal(&self.path, result);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let path = std::mem::take(&mut self.path);
        match Handle::try_current() {
            Ok(handle) => {
                drop(handle.spawn_blocking(move || {
                    let result = std::fs::remove_dir_all(&path);
                    log_removal(&path, result);
                }));
            }
            Err(_) => {
                let result = std::fs::remove_dir_all(&path);
                log_removal(&path, result);
            }
        }
    }
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => debug!(workspace = %path.display(), "Workspace released"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(workspace = %path.display(), "Workspace already gone");
        }
        Err(err) => {
            warn!(workspace = %path.display(), error = %err, "Failed to remove workspace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_creates_unique_dirs() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let a = manager.acquire().await.unwrap();
        let b = manager.acquire().await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert!(b.path().starts_with(root.path()));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let mut ws = manager.acquire().await.unwrap();
        std::fs::create_dir(ws.join("nested")).unwrap();
        std::fs::write(ws.join("nested/slide.jpg"), b"jpeg").unwrap();
        let path = ws.path().to_path_buf();

        ws.release().await;
        assert!(!path.exists());
        ws.release().await;
        assert!(ws.is_released());
    }

    #[tokio::test]
    async fn test_release_tolerates_external_removal() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let mut ws = manager.acquire().await.unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.release().await;
        assert!(ws.is_released());
    }

    #[tokio::test]
    async fn test_drop_releases_on_error_path() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        async fn failing_step(manager: &WorkspaceManager) -> Result<PathBuf, PathBuf> {
            let ws = manager.acquire().await.unwrap();
            std::fs::write(ws.join("input.pptx"), b"deck").unwrap();
            Err(ws.path().to_path_buf())
        }

        let path = failing_step(&manager).await.unwrap_err();
        for _ in 0..100 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("dropped workspace was never removed");
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_workspace() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let (tx, rx) = tokio::sync::oneshot::channel();

        let request = tokio::spawn(async move {
            let ws = manager.acquire().await.unwrap();
            std::fs::write(ws.join("input.pptx"), b"deck").unwrap();
            tx.send(ws.path().to_path_buf()).unwrap();
            // Held until the task is aborted.
            std::future::pending::<()>().await;
            drop(ws);
        });

        let path = rx.await.unwrap();
        assert!(path.is_dir());
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        for _ in 0..100 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workspace outlived its cancelled request");
    }

    #[test]
    fn test_drop_outside_runtime_removes_immediately() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let runtime = tokio::runtime::Runtime::new().unwrap();

        let ws = runtime.block_on(manager.acquire()).unwrap();
        let path = ws.path().to_path_buf();
        drop(runtime);

        drop(ws);
        assert!(!path.exists());
    }
}
