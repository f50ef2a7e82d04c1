//! Digest cache for incremental builds.
//!
//! Every target output `X` has a sibling `X.digest` holding the 64-bit
//! expected digest (hex) observed at the last successful build. Absence or
//! mismatch forces a rebuild.

use std::path::Path;

use anyhow::Result;

use crate::util::fs::write_string;
use crate::util::hash;

/// Read the cached digest next to `output`, if present and well-formed.
pub fn read_digest(output: &Path) -> Option<u64> {
    let path = digest_path(output);
    let content = std::fs::read_to_string(path).ok()?;
    hash::from_hex(&content)
}

/// Write the digest file next to `output`.
pub fn write_digest(output: &Path, digest: u64) -> Result<()> {
    write_string(&digest_path(output), &hash::to_hex(digest))
}

fn digest_path(output: &Path) -> std::path::PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".digest");
    output.with_file_name(name)
}

/// A target is fresh when its cached digest matches the expected one and
/// the output itself is still on disk.
pub fn is_fresh(output: &Path, expected: u64) -> bool {
    output.exists() && read_digest(output) == Some(expected)
}
