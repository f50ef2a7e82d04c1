//! Filesystem helpers shared by the scanner, executor, and digest cache.
//!
//! Build outputs land in directories that may not exist yet, and staleness
//! checks tolerate files that have disappeared, so these wrappers lean on
//! idempotent operations and attach the offending path to every error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Create `path` and any missing parents; an existing directory is fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Delete a directory tree. A directory that is already gone is not an
/// error, so `fathom clean` can run repeatedly.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Read a UTF-8 file, naming the path in the error.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Write `contents` to `path`, creating the parent directory first (log and
/// digest files sit next to outputs that may not have been built yet).
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Resolve symlinks and relative components where possible. Paths that do
/// not exist yet (planned outputs) come back unchanged instead of failing.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The path of `path` relative to `base`; used to mirror a package's source
/// tree under the build prefix. Falls back to `path` itself when the two
/// share no common root.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Whether a file name starts with a dot; the scanner skips these.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
