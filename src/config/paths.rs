//! Filesystem path helpers used by config loading and TLS file checks.

use std::path::{Path, PathBuf};

/// Resolve `path` to an absolute path.
///
/// Relative paths are joined onto the current working directory. If that
/// fails the input is returned unchanged, so the existence check that
/// usually follows reports the original path.
pub fn full_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match std::path::absolute(path) {
        Ok(abs) => abs,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not resolve absolute path");
            path.to_path_buf()
        }
    }
}

/// Returns true if `path` points at an existing file or directory.
pub fn is_valid_path(path: impl AsRef<Path>) -> bool {
    path.as_ref().try_exists().unwrap_or(false)
}
