//! Batch Loader
//!
//! Reads the files of one batch into a [`LoadedFileSet`]. Individual files
//! that cannot be used are skipped with a warning; only a batch with nothing
//! usable is an error.

use std::path::Path;
use tracing::{Span, debug, warn};

use super::locator::{is_contained_file, locate};
use crate::config::GradingConfig;
use crate::constants::grading::MAX_FILES_PER_BATCH;
use crate::types::{GraderError, Result};

/// Ordered relative-path → content mapping with unique keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedFileSet {
    files: Vec<(String, String)>,
}

impl LoadedFileSet {
    /// Insert unless the key is already present; returns whether it was added
    pub fn insert(&mut self, relative_path: String, content: String) -> bool {
        if self.contains(&relative_path) {
            return false;
        }
        self.files.push((relative_path, content));
        true
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.iter().any(|(path, _)| path == relative_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|(path, _)| path.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct BatchLoader {
    max_files: usize,
    max_file_bytes: u64,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self::from_config(&GradingConfig::default())
    }
}

impl BatchLoader {
    pub fn from_config(config: &GradingConfig) -> Self {
        Self {
            max_files: config.max_files_per_batch.clamp(1, MAX_FILES_PER_BATCH),
            max_file_bytes: config.max_file_bytes,
        }
    }

    /// [`load_batch`](Self::load_batch) on the blocking pool, inside the caller's span
    pub async fn load(&self, root: &Path, filenames: &[String]) -> Result<LoadedFileSet> {
        let loader = self.clone();
        let root = root.to_path_buf();
        let filenames = filenames.to_vec();
        let span = Span::current();

        tokio::task::spawn_blocking(move || span.in_scope(|| loader.load_batch(&root, &filenames)))
            .await
            .map_err(|e| {
                GraderError::Io(std::io::Error::other(format!("batch load task failed: {}", e)))
            })?
    }

    /// Load up to the first `max_files` requested names found under `root`
    pub fn load_batch(&self, root: &Path, filenames: &[String]) -> Result<LoadedFileSet> {
        let requested = if filenames.len() > self.max_files {
            warn!(
                "Batch lists {} files; only the first {} files will be analyzed",
                filenames.len(),
                self.max_files
            );
            &filenames[..self.max_files]
        } else {
            filenames
        };

        let mut set = LoadedFileSet::default();

        for name in requested {
            let Some(path) = locate(root, name) else {
                warn!("File not found in repository: {}", name);
                continue;
            };
            if !is_contained_file(root, &path) {
                warn!("Skipping {}: resolves outside the repository", name);
                continue;
            }

            let size = match std::fs::metadata(&path) {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };
            if size > self.max_file_bytes {
                warn!(
                    "Skipping {}: {} bytes exceeds the {} byte limit",
                    name, size, self.max_file_bytes
                );
                continue;
            }

            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Cannot read {}: {}", path.display(), e);
                    continue;
                }
            };

            let content = String::from_utf8_lossy(&bytes).trim().to_string();
            if content.is_empty() {
                warn!("Skipping empty file: {}", name);
                continue;
            }

            let key = relative_key(root, &path);
            if set.insert(key.clone(), content) {
                debug!("Loaded {} ({} bytes)", key, size);
            } else {
                debug!("{} already loaded in this batch", key);
            }
        }

        if set.is_empty() {
            return Err(GraderError::NoFilesLoaded);
        }

        Ok(set)
    }
}

/// `/`-separated path relative to `root`
fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_truncates_to_five() {
        let root = TempDir::new().unwrap();
        let files: Vec<String> = (1..=7).map(|i| format!("f{}.py", i)).collect();
        for name in &files {
            fs::write(root.path().join(name), format!("x = '{}'", name)).unwrap();
        }

        let set = BatchLoader::default().load_batch(root.path(), &files).unwrap();
        assert_eq!(set.paths(), names(&["f1.py", "f2.py", "f3.py", "f4.py", "f5.py"]));
    }

    #[test]
    fn test_skips_missing_and_empty() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.py"), "  print('a')\n\n").unwrap();
        fs::write(root.path().join("empty.py"), "   \n").unwrap();

        let set = BatchLoader::default()
            .load_batch(root.path(), &names(&["missing.py", "empty.py", "a.py"]))
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next(), Some(("a.py", "print('a')")));
    }

    #[test]
    fn test_nothing_loaded_is_error() {
        let root = TempDir::new().unwrap();
        let result = BatchLoader::default().load_batch(root.path(), &names(&["nope.py"]));
        assert!(matches!(result, Err(GraderError::NoFilesLoaded)));

        let result = BatchLoader::default().load_batch(root.path(), &[]);
        assert!(matches!(result, Err(GraderError::NoFilesLoaded)));
    }

    #[test]
    fn test_keys_are_relative_and_deduplicated() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("pkg")).unwrap();
        fs::write(root.path().join("pkg/mod.py"), "VALUE = 1").unwrap();

        let set = BatchLoader::default()
            .load_batch(root.path(), &names(&["mod.py", "pkg/mod.py"]))
            .unwrap();

        assert_eq!(set.paths(), names(&["pkg/mod.py"]));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("bin.py"), b"ok = 1\xff").unwrap();

        let set = BatchLoader::default()
            .load_batch(root.path(), &names(&["bin.py"]))
            .unwrap();
        let (_, content) = set.iter().next().unwrap();
        assert!(content.starts_with("ok = 1"));
        assert!(content.contains('\u{fffd}'));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_secret_never_loaded() {
        use std::os::unix::fs::symlink;

        let outer = TempDir::new().unwrap();
        fs::write(outer.path().join("server.env"), "AZURE_OPENAI_API_KEY=secret").unwrap();
        let root = outer.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        symlink(outer.path().join("server.env"), root.join("main.py")).unwrap();
        fs::write(root.join("app.py"), "print('app')").unwrap();

        let set = BatchLoader::default()
            .load_batch(&root, &names(&["main.py", "app.py"]))
            .unwrap();
        assert_eq!(set.paths(), names(&["app.py"]));

        let result = BatchLoader::default().load_batch(&root, &names(&["main.py"]));
        assert!(matches!(result, Err(GraderError::NoFilesLoaded)));
    }

    #[tokio::test]
    async fn test_async_load_matches_blocking_load() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.py"), "x = 1").unwrap();

        let set = BatchLoader::default()
            .load(root.path(), &names(&["a.py", "missing.py"]))
            .await
            .unwrap();
        assert_eq!(set.iter().next(), Some(("a.py", "x = 1")));
    }

    #[test]
    fn test_oversized_file_skipped() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("big.py"), "x".repeat(64)).unwrap();
        fs::write(root.path().join("small.py"), "y = 2").unwrap();

        let loader = BatchLoader::from_config(&GradingConfig {
            max_file_bytes: 32,
            ..GradingConfig::default()
        });
        let set = loader
            .load_batch(root.path(), &names(&["big.py", "small.py"]))
            .unwrap();

        assert_eq!(set.paths(), names(&["small.py"]));
    }
}
