//! Repository Workspaces
//!
//! A [`Workspace`] is the temporary directory one grading run reads from.
//! Fetchers create it, the locator and loader read it, and it is removed
//! when the guard is cleaned up or dropped (including when the request
//! future is cancelled).

pub mod fetcher;
pub mod loader;
pub mod locator;

pub use fetcher::{ArchiveFetcher, GitFetcher, RepositoryFetcher, SharedFetcher};
pub use loader::{BatchLoader, LoadedFileSet};
pub use locator::locate;

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::constants::fetch::WORKSPACE_PREFIX;
use crate::types::Result;

/// Owning guard over a temporary repository checkout
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    root: PathBuf,
}

impl Workspace {
    /// Allocate a fresh, empty workspace under `parent` (system temp dir when `None`)
    pub fn create_in(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        let root = dir.path().to_path_buf();
        Ok(Self { dir, root })
    }

    /// Point the readable root at a subdirectory of the workspace
    pub fn with_root(mut self, relative: impl AsRef<Path>) -> Self {
        self.root = self.dir.path().join(relative);
        self
    }

    /// Directory the repository contents live under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that gets removed on cleanup
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace, logging the outcome. Never fails.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();

        match self.dir.close() {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Workspace {} was already removed", path.display());
            }
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_parent_and_cleanup() {
        let parent = TempDir::new().unwrap();
        let workspace = Workspace::create_in(Some(parent.path())).unwrap();
        let path = workspace.path().to_path_buf();

        assert!(path.starts_with(parent.path()));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("repograde-")
        );

        workspace.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = TempDir::new().unwrap();
        let path = {
            let workspace = Workspace::create_in(Some(parent.path())).unwrap();
            std::fs::write(workspace.root().join("a.py"), "print(1)").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_directory() {
        let workspace = Workspace::create_in(None).unwrap();
        std::fs::remove_dir_all(workspace.path()).unwrap();
        workspace.cleanup();
    }

    #[test]
    fn test_with_root() {
        let workspace = Workspace::create_in(None).unwrap().with_root("repo");
        assert_eq!(workspace.root(), workspace.path().join("repo"));
    }
}
