//! Source discovery - enumerating candidate files under project roots.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::util::fs::{is_hidden, normalize_path};

/// Fortran source extensions recognized by default.
pub const FORTRAN_EXTENSIONS: &[&str] = &["f90", "f"];

/// C and C++ source extensions.
pub const C_EXTENSIONS: &[&str] = &["c", "h", "cpp", "hpp"];

/// Which family of files a scan is looking for.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    /// Lowercased extensions to accept.
    extensions: Vec<String>,
}

impl ScanFilter {
    /// Fortran files plus any user-declared preprocessed suffixes.
    pub fn fortran(extra_suffixes: &[String]) -> Self {
        let mut extensions: Vec<String> =
            FORTRAN_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for suffix in extra_suffixes {
            extensions.push(suffix.trim_start_matches('.').to_lowercase());
        }
        ScanFilter { extensions }
    }

    /// C and C++ files.
    pub fn c_family() -> Self {
        ScanFilter {
            extensions: C_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Both families combined.
    pub fn all(extra_suffixes: &[String]) -> Self {
        let mut filter = Self::fortran(extra_suffixes);
        filter
            .extensions
            .extend(C_EXTENSIONS.iter().map(|e| e.to_string()));
        filter
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                self.extensions.iter().any(|accepted| *accepted == e)
            })
            .unwrap_or(false)
    }
}

/// Enumerate files under `root` matching the filter.
///
/// Hidden files and directories are skipped. Paths are canonicalized, and
/// anything already in `seen` is dropped; newly returned paths are added to
/// `seen`.
pub fn scan_directory(
    root: &Path,
    filter: &ScanFilter,
    recursive: bool,
    seen: &mut BTreeSet<PathBuf>,
) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.path()) || e.depth() == 0);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !filter.matches(entry.path()) {
            continue;
        }

        let canonical = normalize_path(entry.path());
        if seen.insert(canonical.clone()) {
            found.push(canonical);
        }
    }

    found
}
