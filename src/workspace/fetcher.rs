//! Repository Fetchers
//!
//! Materialize a repository into a fresh [`Workspace`]:
//! - [`GitFetcher`]: shallow `git clone` of a GitHub URL, bounded by a timeout
//! - [`ArchiveFetcher`]: extraction of an uploaded zip archive
//!
//! Every failure after the workspace exists removes it before the error
//! propagates.

use async_trait::async_trait;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::Workspace;
use crate::config::FetchConfig;
use crate::constants::fetch::{MIN_ARCHIVE_BYTES, ZIP_MAGIC};
use crate::types::{GraderError, Result};

/// Source of repository workspaces
#[async_trait]
pub trait RepositoryFetcher: Send + Sync {
    /// Validate `source_reference` and materialize it into a new workspace
    async fn fetch(&self, source_reference: &str) -> Result<Workspace>;

    /// Fetcher name for logging
    fn name(&self) -> &str;
}

pub type SharedFetcher = Arc<dyn RepositoryFetcher>;

// =============================================================================
// Git
// =============================================================================

/// Subdirectory of the workspace the clone lands in
const CLONE_DIR: &str = "repo";

#[derive(Debug, Clone)]
pub struct GitFetcher {
    git_binary: String,
    clone_depth: u32,
    timeout: Duration,
    accepted_hosts: Vec<String>,
    workspace_dir: Option<PathBuf>,
}

impl GitFetcher {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            git_binary: config.git_binary.clone(),
            clone_depth: config.clone_depth,
            timeout: config.clone_timeout(),
            accepted_hosts: config.accepted_hosts.clone(),
            workspace_dir: config.workspace_dir.clone(),
        }
    }

    /// Check a reference without touching the network; returns it trimmed
    pub fn validate_reference<'a>(&self, reference: &'a str) -> Result<&'a str> {
        let reference = reference.trim();

        if reference.is_empty() {
            return Err(GraderError::InvalidReference(
                "repository link cannot be empty".to_string(),
            ));
        }

        if !self
            .accepted_hosts
            .iter()
            .any(|host| reference.contains(host.as_str()))
        {
            return Err(GraderError::InvalidReference(format!(
                "only links containing {} are supported, got '{}'",
                self.accepted_hosts.join(" or "),
                reference
            )));
        }

        Ok(reference)
    }

    async fn clone_into(&self, reference: &str, target: &Path) -> Result<()> {
        let child = Command::new(&self.git_binary)
            .arg("clone")
            .arg("--depth")
            .arg(self.clone_depth.to_string())
            .arg("--")
            .arg(reference)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GraderError::ToolMissing {
                    tool: self.git_binary.clone(),
                },
                _ => GraderError::Io(e),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(GraderError::FetchTimeout {
                    duration: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(GraderError::FetchFailed {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RepositoryFetcher for GitFetcher {
    #[instrument(skip(self), fields(fetcher = "git"))]
    async fn fetch(&self, source_reference: &str) -> Result<Workspace> {
        let reference = self.validate_reference(source_reference)?;

        let workspace = Workspace::create_in(self.workspace_dir.as_deref())?.with_root(CLONE_DIR);
        info!(
            "Cloning {} into {}",
            reference,
            workspace.root().display()
        );

        match self.clone_into(reference, workspace.root()).await {
            Ok(()) => {
                debug!("Clone finished");
                Ok(workspace)
            }
            Err(e) => {
                warn!("Clone of {} failed: {}", reference, e);
                workspace.cleanup();
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "git"
    }
}

// =============================================================================
// Zip Archive
// =============================================================================

/// Extracts zip archives; `fetch` takes a path to the archive file
#[derive(Debug, Clone, Default)]
pub struct ArchiveFetcher {
    workspace_dir: Option<PathBuf>,
}

impl ArchiveFetcher {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            workspace_dir: config.workspace_dir.clone(),
        }
    }

    /// Check the zip signature before anything is written to disk
    pub fn validate_archive(bytes: &[u8]) -> Result<()> {
        if bytes.len() < MIN_ARCHIVE_BYTES || !bytes.starts_with(ZIP_MAGIC) {
            return Err(GraderError::InvalidArchive(
                "Invalid zip data".to_string(),
            ));
        }
        Ok(())
    }

    /// Extract archive bytes into a fresh workspace
    pub async fn unpack(&self, bytes: Vec<u8>) -> Result<Workspace> {
        Self::validate_archive(&bytes)?;

        let workspace = Workspace::create_in(self.workspace_dir.as_deref())?;
        let target = workspace.root().to_path_buf();

        let extracted = tokio::task::spawn_blocking(move || extract_zip(bytes, &target))
            .await
            .map_err(|e| GraderError::InvalidArchive(format!("extraction task failed: {}", e)))
            .and_then(|result| result);

        match extracted {
            Ok(count) => {
                info!(
                    "Extracted {} archive entries into {}",
                    count,
                    workspace.root().display()
                );
                Ok(workspace)
            }
            Err(e) => {
                workspace.cleanup();
                Err(e)
            }
        }
    }
}

/// zip sanitizes entry names (`enclosed_name`) so nothing escapes `target`
fn extract_zip(bytes: Vec<u8>, target: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| GraderError::InvalidArchive(e.to_string()))?;
    let count = archive.len();
    archive
        .extract(target)
        .map_err(|e| GraderError::InvalidArchive(e.to_string()))?;
    Ok(count)
}

#[async_trait]
impl RepositoryFetcher for ArchiveFetcher {
    #[instrument(skip(self), fields(fetcher = "archive"))]
    async fn fetch(&self, source_reference: &str) -> Result<Workspace> {
        let path = source_reference.trim();
        if path.is_empty() {
            return Err(GraderError::InvalidReference(
                "archive path cannot be empty".to_string(),
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GraderError::InvalidArchive(format!("cannot read {}: {}", path, e)))?;

        self.unpack(bytes).await
    }

    fn name(&self) -> &str {
        "archive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn git_fetcher(parent: &Path) -> GitFetcher {
        GitFetcher::from_config(&FetchConfig {
            workspace_dir: Some(parent.to_path_buf()),
            ..FetchConfig::default()
        })
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_validate_reference() {
        let parent = TempDir::new().unwrap();
        let fetcher = git_fetcher(parent.path());

        assert_eq!(
            fetcher
                .validate_reference("  https://github.com/user/repo  ")
                .unwrap(),
            "https://github.com/user/repo"
        );
        assert!(fetcher.validate_reference("https://user.github.io/site").is_ok());
        assert!(matches!(
            fetcher.validate_reference("   "),
            Err(GraderError::InvalidReference(_))
        ));
        assert!(matches!(
            fetcher.validate_reference("https://gitlab.com/user/repo"),
            Err(GraderError::InvalidReference(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_reference_creates_nothing() {
        let parent = TempDir::new().unwrap();
        let fetcher = git_fetcher(parent.path());

        let result = fetcher.fetch("ftp://example.com/repo").await;
        assert!(matches!(result, Err(GraderError::InvalidReference(_))));
        assert_eq!(entries(parent.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_git_binary() {
        let parent = TempDir::new().unwrap();
        let mut fetcher = git_fetcher(parent.path());
        fetcher.git_binary = "repograde-no-such-git-binary".to_string();

        match fetcher.fetch("https://github.com/user/repo").await {
            Err(GraderError::ToolMissing { tool }) => {
                assert_eq!(tool, "repograde-no-such-git-binary")
            }
            other => panic!("unexpected result: {:?}", other.map(|w| w.root().to_path_buf())),
        }
        assert_eq!(entries(parent.path()), 0);
    }

    #[cfg(unix)]
    fn fake_git(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-git.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clone_failure_reports_stderr_and_cleans_up() {
        let bin = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let mut fetcher = git_fetcher(parent.path());
        fetcher.git_binary = fake_git(bin.path(), "echo 'repository not found' >&2\nexit 128");

        match fetcher.fetch("https://github.com/user/missing").await {
            Err(GraderError::FetchFailed { stderr }) => {
                assert_eq!(stderr, "repository not found")
            }
            other => panic!("unexpected result: {:?}", other.map(|w| w.root().to_path_buf())),
        }
        assert_eq!(entries(parent.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clone_timeout_cleans_up() {
        let bin = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let mut fetcher = git_fetcher(parent.path());
        fetcher.git_binary = fake_git(bin.path(), "sleep 30");
        fetcher.timeout = Duration::from_millis(200);

        let result = fetcher.fetch("https://github.com/user/slow").await;
        assert!(matches!(result, Err(GraderError::FetchTimeout { .. })));
        assert_eq!(entries(parent.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clone_success_populates_workspace() {
        let bin = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let mut fetcher = git_fetcher(parent.path());
        // The target directory is the last argument
        fetcher.git_binary = fake_git(
            bin.path(),
            "for last; do :; done\nmkdir -p \"$last\"\necho 'print(1)' > \"$last/main.py\"",
        );

        let workspace = fetcher.fetch("https://github.com/user/repo").await.unwrap();
        assert!(workspace.root().join("main.py").is_file());

        let path = workspace.path().to_path_buf();
        workspace.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn test_validate_archive() {
        assert!(ArchiveFetcher::validate_archive(b"PK\x03\x04rest").is_ok());
        assert!(ArchiveFetcher::validate_archive(b"PK").is_err());
        assert!(ArchiveFetcher::validate_archive(b"not a zip").is_err());
    }

    #[tokio::test]
    async fn test_unpack_archive() {
        let parent = TempDir::new().unwrap();
        let fetcher = ArchiveFetcher {
            workspace_dir: Some(parent.path().to_path_buf()),
        };

        let bytes = zip_bytes(&[("src/app.py", "print('hi')"), ("README.md", "# demo")]);
        let workspace = fetcher.unpack(bytes).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(workspace.root().join("src/app.py")).unwrap(),
            "print('hi')"
        );
        workspace.cleanup();
        assert_eq!(entries(parent.path()), 0);
    }

    #[tokio::test]
    async fn test_corrupt_archive_cleans_up() {
        let parent = TempDir::new().unwrap();
        let fetcher = ArchiveFetcher {
            workspace_dir: Some(parent.path().to_path_buf()),
        };

        let result = fetcher.unpack(b"PK\x03\x04 definitely not a zip".to_vec()).await;
        assert!(matches!(result, Err(GraderError::InvalidArchive(_))));
        assert_eq!(entries(parent.path()), 0);
    }

    #[tokio::test]
    async fn test_fetch_archive_from_path() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("submission.zip");
        std::fs::write(&archive, zip_bytes(&[("a.py", "x = 1")])).unwrap();

        let workspace = ArchiveFetcher::default()
            .fetch(&archive.to_string_lossy())
            .await
            .unwrap();
        assert!(workspace.root().join("a.py").is_file());
    }
}
