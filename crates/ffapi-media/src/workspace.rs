//! Per-job workspace directories.
//!
//! A [`JobWorkspace`] is a directory named after the job ID under a shared
//! work root. It holds every materialized input and every file the pipeline
//! produces, and is removed when the job ends: explicitly through
//! [`JobWorkspace::release`], or on drop if the owner never got that far.

use std::path::{Path, PathBuf};

use ffapi_models::JobId;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Ephemeral working directory owned by one job.
#[derive(Debug)]
pub struct JobWorkspace {
    path: PathBuf,
    released: bool,
}

impl JobWorkspace {
    /// Create the shared work root. Called once at startup.
    pub async fn prepare_root(root: &Path) -> MediaResult<()> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| MediaError::Workspace {
                path: root.to_path_buf(),
                source,
            })
    }

    /// Create `root/<job_id>`.
    ///
    /// The directory is created non-recursively so an existing directory
    /// with the same name is an error rather than shared state.
    pub async fn acquire(root: &Path, job_id: &JobId) -> MediaResult<Self> {
        let path = root.join(job_id.as_str());

        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| MediaError::Workspace {
                path: path.clone(),
                source,
            })?;

        debug!("Created job workspace {}", path.display());
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a named file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the workspace and everything in it.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn release(mut self) {
        self.released = true;
        debug!("Cleaning job workspace {}", self.path.display());

        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            warn!(
                "Failed to remove job workspace {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

impl Drop for JobWorkspace {
    /// Removal runs on the blocking pool when a runtime is available, so a
    /// body dropped on a worker thread does not stall it.
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => drop(handle.spawn_blocking(move || remove_on_drop(&path))),
            Err(_) => remove_on_drop(&path),
        }
    }
}

fn remove_on_drop(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => debug!("Cleaned job workspace {} on drop", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove job workspace {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let root = TempDir::new().unwrap();
        let workspace = JobWorkspace::acquire(root.path(), &JobId::new())
            .await
            .unwrap();

        assert!(workspace.path().is_dir());
        assert!(workspace.path().starts_with(root.path()));

        tokio::fs::write(workspace.file("out.mp4"), b"data").await.unwrap();
        tokio::fs::create_dir(workspace.file("frames")).await.unwrap();
        tokio::fs::write(workspace.file("frames/0001.png"), b"png").await.unwrap();

        let path = workspace.path().to_path_buf();
        workspace.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let path = {
            let workspace = JobWorkspace::acquire(root.path(), &JobId::new())
                .await
                .unwrap();
            tokio::fs::write(workspace.file("in.mp4"), b"data").await.unwrap();
            workspace.path().to_path_buf()
        };

        for _ in 0..100 {
            if !path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_outside_runtime_removes_synchronously() {
        let root = TempDir::new().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let workspace = runtime
            .block_on(JobWorkspace::acquire(root.path(), &JobId::new()))
            .unwrap();
        std::fs::write(workspace.file("out.mp4"), b"data").unwrap();
        let path = workspace.path().to_path_buf();

        drop(workspace);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_workspaces_are_distinct() {
        let root = TempDir::new().unwrap();
        let a = JobWorkspace::acquire(root.path(), &JobId::new()).await.unwrap();
        let b = JobWorkspace::acquire(root.path(), &JobId::new()).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_acquire_rejects_existing_name() {
        let root = TempDir::new().unwrap();
        let id = JobId::new();
        let _first = JobWorkspace::acquire(root.path(), &id).await.unwrap();
        let second = JobWorkspace::acquire(root.path(), &id).await;
        assert!(matches!(second, Err(MediaError::Workspace { .. })));
    }

    #[tokio::test]
    async fn test_acquire_without_root_fails() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("not-prepared");
        let result = JobWorkspace::acquire(&missing, &JobId::new()).await;
        assert!(matches!(result, Err(MediaError::Workspace { .. })));

        JobWorkspace::prepare_root(&missing).await.unwrap();
        JobWorkspace::prepare_root(&missing).await.unwrap();
        assert!(JobWorkspace::acquire(&missing, &JobId::new()).await.is_ok());
    }
}
