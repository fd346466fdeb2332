use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::fs::remove_dir_all_writable;

use super::plan::PACKAGE_DIR_NAME;

const WORKSPACE_PREFIX: &str = "pylayer-";

/// Ephemeral directory owned by a single layer build.
///
/// The tree is removed when the guard drops, on every exit path. Call
/// [`LayerWorkspace::close`] on the success path to surface removal errors.
pub struct LayerWorkspace {
    inner: Option<tempfile::TempDir>,
    root: PathBuf,
    package_dir: PathBuf,
}

impl LayerWorkspace {
    /// Creates a fresh workspace under the OS temp directory.
    ///
    /// # Errors
    /// Returns an error if the directory tree cannot be created.
    pub fn create() -> Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Creates a fresh workspace under `parent`.
    ///
    /// # Errors
    /// Returns an error if the directory tree cannot be created.
    pub fn create_in(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .with_context(|| format!("failed to create temp dir under {}", parent.display()))?;
        let root = dir.path().to_path_buf();
        let package_dir = root.join(PACKAGE_DIR_NAME);
        fs::create_dir(&package_dir)
            .with_context(|| format!("failed to create {}", package_dir.display()))?;
        tracing::debug!(workspace = %root.display(), "created layer workspace");
        Ok(Self {
            inner: Some(dir),
            root,
            package_dir,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `python/` directory packages are installed into.
    #[must_use]
    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    #[must_use]
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Removes the workspace now, reporting any failure.
    ///
    /// # Errors
    /// Returns an error if the directory tree cannot be removed.
    pub fn close(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        let Some(dir) = self.inner.take() else {
            return Ok(());
        };
        let path = dir.keep();
        remove_dir_all_writable(&path)?;
        tracing::debug!(workspace = %path.display(), "removed layer workspace");
        Ok(())
    }
}

impl Drop for LayerWorkspace {
    fn drop(&mut self) {
        if let Err(err) = self.remove() {
            tracing::warn!(
                workspace = %self.root.display(),
                "failed to remove layer workspace: {err:#}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_contains_package_dir() {
        let parent = tempfile::tempdir().expect("tempdir");
        let workspace = LayerWorkspace::create_in(parent.path()).expect("workspace");
        assert!(workspace.package_dir().is_dir());
        assert_eq!(workspace.package_dir(), workspace.root().join("python"));
        assert_eq!(
            workspace.archive_path("demo.zip"),
            workspace.root().join("demo.zip")
        );
        assert!(workspace
            .root()
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(WORKSPACE_PREFIX)));
    }

    #[test]
    fn create_leaves_sibling_directories_alone() {
        let parent = tempfile::tempdir().expect("tempdir");
        let sibling = parent.path().join("pylayer-notes");
        fs::create_dir_all(&sibling).expect("sibling dir");
        fs::write(sibling.join("important.txt"), b"keep me").expect("write");

        let workspace = LayerWorkspace::create_in(parent.path()).expect("workspace");
        workspace.close().expect("close");

        assert_eq!(
            fs::read(sibling.join("important.txt")).expect("sibling survives"),
            b"keep me"
        );
    }

    #[test]
    fn drop_removes_workspace_with_contents() {
        let parent = tempfile::tempdir().expect("tempdir");
        let workspace = LayerWorkspace::create_in(parent.path()).expect("workspace");
        let root = workspace.root().to_path_buf();
        fs::create_dir_all(workspace.package_dir().join("pkg")).expect("pkg dir");
        fs::write(workspace.package_dir().join("pkg/__init__.py"), b"").expect("write");
        drop(workspace);
        assert!(!root.exists(), "workspace should be removed on drop");
    }

    #[test]
    fn close_removes_workspace() {
        let parent = tempfile::tempdir().expect("tempdir");
        let workspace = LayerWorkspace::create_in(parent.path()).expect("workspace");
        let root = workspace.root().to_path_buf();
        workspace.close().expect("close");
        assert!(!root.exists(), "workspace should be removed on close");
    }

    #[test]
    fn drop_during_unwind_still_removes_workspace() {
        let parent = tempfile::tempdir().expect("tempdir");
        let parent_path = parent.path().to_path_buf();
        let root = std::sync::Mutex::new(None);
        let result = std::panic::catch_unwind(|| {
            let workspace = LayerWorkspace::create_in(&parent_path).expect("workspace");
            *root.lock().expect("lock") = Some(workspace.root().to_path_buf());
            panic!("install step blew up");
        });
        assert!(result.is_err());
        let root = root.lock().expect("lock").clone().expect("root recorded");
        assert!(!root.exists(), "workspace should be removed during unwind");
    }
}
