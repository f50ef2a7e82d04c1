//! Content digests for incremental builds.
//!
//! All staleness decisions in fathom rest on 64-bit FNV-1a digests of
//! normalized source text: line endings are collapsed to `\n` and tabs are
//! expanded to 8-column stops before hashing, so editor-only changes do not
//! force rebuilds.

use std::hash::Hasher;
use std::path::Path;

use anyhow::{Context, Result};
use fnv::FnvHasher;

/// Tab stops used during normalization.
const TAB_WIDTH: usize = 8;

/// Compute the digest of raw bytes after normalization.
pub fn digest_bytes(data: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(&normalize(data));
    hasher.finish()
}

/// Compute the digest of a string after normalization.
pub fn digest_str(s: &str) -> u64 {
    digest_bytes(s.as_bytes())
}

/// Compute the digest of a file's contents.
pub fn digest_file(path: &Path) -> Result<u64> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read file for digest: {}", path.display()))?;
    Ok(digest_bytes(&data))
}

/// Expand tabs to 8-column stops and drop carriage returns.
fn normalize(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut column = 0usize;

    for &byte in data {
        match byte {
            b'\r' => {}
            b'\n' => {
                out.push(b'\n');
                column = 0;
            }
            b'\t' => {
                let pad = TAB_WIDTH - (column % TAB_WIDTH);
                out.extend(std::iter::repeat(b' ').take(pad));
                column += pad;
            }
            _ => {
                out.push(byte);
                column += 1;
            }
        }
    }

    out
}

/// An incremental digest builder for combining multiple components.
///
/// Used for expected target digests: source digest, dependency digests,
/// and the flag string are folded in one by one.
#[derive(Default)]
pub struct DigestBuilder {
    hasher: FnvHasher,
}

impl DigestBuilder {
    /// Create a new digest builder.
    pub fn new() -> Self {
        DigestBuilder {
            hasher: FnvHasher::default(),
        }
    }

    /// Fold in a 64-bit component.
    pub fn update_u64(&mut self, value: u64) -> &mut Self {
        self.hasher.write(&value.to_le_bytes());
        self
    }

    /// Fold in a string component with a terminator so that adjacent
    /// components cannot alias.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.write(s.as_bytes());
        self.hasher.write(b"\0");
        self
    }

    /// Finalize the digest.
    pub fn finish(self) -> u64 {
        self.hasher.finish()
    }
}

/// Format a digest the way the cache files store it.
pub fn to_hex(digest: u64) -> String {
    format!("{digest:016x}")
}

/// Parse a digest from its cache-file form.
pub fn from_hex(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim(), 16).ok()
}
