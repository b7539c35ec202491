use polly_core::paths::POLLY_DIR;
use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `POLLY_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.polly/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
///
/// The result is always absolute: agent tools report absolute paths, and
/// those are matched against the layout by prefix.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return canonical_root(p);
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let found = find_marker(&cwd, POLLY_DIR)
        .or_else(|| find_marker(&cwd, ".git"))
        .unwrap_or(cwd);
    canonical_root(&found)
}

/// Absolute form of `path` with `.`, `..` and symlinks resolved. A path that
/// cannot be canonicalized (missing, unreadable) is joined onto the cwd.
pub fn canonical_root(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

fn find_marker(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}
