//! File Locator
//!
//! Resolves a requested filename to a file inside a workspace. An exact
//! relative path wins; otherwise the tree is walked in lexicographic order
//! (siblings sorted by name, depth first) and the first path-suffix match,
//! then the first basename match, is returned.
//!
//! Symlinks are never followed: a committed link could point at files
//! outside the workspace, such as the service's own `.env`.

use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

use crate::constants::fetch::VCS_DIR;

/// Resolve `name` under `root`, or `None` when nothing matches
pub fn locate(root: &Path, name: &str) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let requested = Path::new(name);
    let components: Vec<&str> = requested
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    if is_plain_relative(requested) {
        let direct = root.join(requested);
        if is_contained_file(root, &direct) {
            return Some(direct);
        }
    }

    let basename = *components.last()?;
    let mut basename_match = None;

    for path in walk_files(root) {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        if ends_with_components(relative, &components) {
            return Some(path);
        }

        if basename_match.is_none() && relative.file_name().and_then(|f| f.to_str()) == Some(basename) {
            basename_match = Some(path);
        }
    }

    basename_match
}

/// A regular file (not a symlink) that resolves to a path under `root`
pub(crate) fn is_contained_file(root: &Path, path: &Path) -> bool {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return false;
    };
    if !metadata.file_type().is_file() {
        return false;
    }

    // Catches symlinked parent directories as well
    match (root.canonicalize(), path.canonicalize()) {
        (Ok(root), Ok(resolved)) => resolved.starts_with(root),
        _ => false,
    }
}

/// Relative, and never steps outside its base
fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn ends_with_components(relative: &Path, components: &[&str]) -> bool {
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    parts.len() >= components.len() && parts[parts.len() - components.len()..] == *components
}

/// Regular files under `root`, skipping `.git`, in deterministic order
fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false) // Security: prevent symlink traversal attacks
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| entry.file_name() != VCS_DIR)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("# {}", file)).unwrap();
        }
        dir
    }

    fn relative(root: &TempDir, found: Option<PathBuf>) -> Option<String> {
        found.map(|p| {
            p.strip_prefix(root.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
    }

    #[test]
    fn test_exact_join_wins() {
        let root = tree(&["a/util.py", "util.py"]);
        assert_eq!(
            relative(&root, locate(root.path(), "util.py")),
            Some("util.py".to_string())
        );
    }

    #[test]
    fn test_bare_name_found_by_walk() {
        let root = tree(&["src/pkg/main.py"]);
        assert_eq!(
            relative(&root, locate(root.path(), "main.py")),
            Some("src/pkg/main.py".to_string())
        );
    }

    #[test]
    fn test_duplicate_basenames_resolve_lexicographically() {
        let root = tree(&["zeta/util.py", "alpha/util.py", "mid/util.py"]);
        for _ in 0..3 {
            assert_eq!(
                relative(&root, locate(root.path(), "util.py")),
                Some("alpha/util.py".to_string())
            );
        }
    }

    #[test]
    fn test_path_suffix_preferred_over_basename() {
        let root = tree(&["a/util.py", "lib/helpers/util.py"]);
        assert_eq!(
            relative(&root, locate(root.path(), "helpers/util.py")),
            Some("lib/helpers/util.py".to_string())
        );
    }

    #[test]
    fn test_basename_fallback_for_unmatched_directory() {
        let root = tree(&["src/util.py"]);
        assert_eq!(
            relative(&root, locate(root.path(), "other/util.py")),
            Some("src/util.py".to_string())
        );
    }

    #[test]
    fn test_git_directory_skipped() {
        let root = tree(&[".git/config", "app/config"]);
        assert_eq!(
            relative(&root, locate(root.path(), "config")),
            Some("app/config".to_string())
        );
    }

    #[test]
    fn test_parent_components_never_joined() {
        let outer = TempDir::new().unwrap();
        fs::write(outer.path().join("secret.py"), "token = 1").unwrap();
        let root = outer.path().join("repo");
        fs::create_dir_all(&root).unwrap();

        assert_eq!(locate(&root, "../secret.py"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_out_of_workspace_ignored() {
        use std::os::unix::fs::symlink;

        let outer = TempDir::new().unwrap();
        let secret = outer.path().join("server.env");
        fs::write(&secret, "AZURE_OPENAI_API_KEY=secret").unwrap();
        let root = outer.path().join("repo");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(outer.path().join("private")).unwrap();
        fs::write(outer.path().join("private/util.py"), "token = 1").unwrap();

        symlink(&secret, root.join("main.py")).unwrap();
        symlink(&secret, root.join("src/app.py")).unwrap();
        symlink(outer.path().join("private"), root.join("linked")).unwrap();

        assert_eq!(locate(&root, "main.py"), None);
        assert_eq!(locate(&root, "app.py"), None);
        assert_eq!(locate(&root, "linked/util.py"), None);
        assert_eq!(locate(&root, "util.py"), None);
    }

    #[test]
    fn test_not_found() {
        let root = tree(&["a.py"]);
        assert_eq!(locate(root.path(), "missing.py"), None);
        assert_eq!(locate(root.path(), "   "), None);
    }

    #[test]
    fn test_directory_is_not_a_match() {
        let root = tree(&["models/user.py"]);
        assert_eq!(locate(root.path(), "models"), None);
    }
}
