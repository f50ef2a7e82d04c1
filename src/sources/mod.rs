//! Source discovery and light parsing.

pub mod c;
pub mod fortran;
pub mod scanner;

use std::path::Path;

use anyhow::Result;

use crate::core::source::SourceFile;

/// Parse one discovered file, dispatching on its extension family.
pub fn parse_source(path: &Path) -> Result<SourceFile> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("c") | Some("h") | Some("cpp") | Some("hpp") => c::parse_c_file(path),
        _ => fortran::parse_fortran_file(path),
    }
}
