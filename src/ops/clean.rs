//! Removing build artifacts.

use std::path::Path;

use anyhow::Result;

use crate::util::fs::remove_dir_all_if_exists;

/// Remove the entire build directory of the project at `manifest_path`.
pub fn clean(manifest_path: &Path) -> Result<()> {
    let project_root = manifest_path.parent().unwrap_or(Path::new("."));
    let build_dir = project_root.join("build");

    if build_dir.exists() {
        tracing::info!("removing {}", build_dir.display());
    }
    remove_dir_all_if_exists(&build_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_build_dir() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("fathom.toml");
        std::fs::write(&manifest, "name = \"p\"\nversion = \"1.0.0\"\n").unwrap();
        std::fs::create_dir_all(tmp.path().join("build/release/p")).unwrap();

        clean(&manifest).unwrap();
        assert!(!tmp.path().join("build").exists());

        // Cleaning twice is fine.
        clean(&manifest).unwrap();
    }
}
