//! Light C and C++ source parsing.
//!
//! Only quoted `#include "..."` directives are tracked; angle-bracket
//! includes are system headers and never build dependencies.

use std::path::Path;

use anyhow::Result;

use crate::core::source::{SourceFile, UnitKind};
use crate::util::diagnostic::BuildError;
use crate::util::hash;

/// Parse a C or C++ source or header file.
pub fn parse_c_file(path: &Path) -> Result<SourceFile> {
    if !path.is_file() {
        return Err(BuildError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|_| BuildError::FileNotFound {
        path: path.to_path_buf(),
    })?;

    let mut source = parse_c_str(&content);
    source.path = path.to_path_buf();
    source.unit_kind = unit_kind_from_extension(path);
    source.digest = hash::digest_str(&content);
    Ok(source)
}

/// Classify a C-family file by its extension.
pub fn unit_kind_from_extension(path: &Path) -> UnitKind {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("c") => UnitKind::CSource,
        Some("h") => UnitKind::CHeader,
        Some("cpp") => UnitKind::CppSource,
        Some("hpp") => UnitKind::CHeader,
        _ => UnitKind::Unknown,
    }
}

/// Scan source text for quoted includes.
pub fn parse_c_str(content: &str) -> SourceFile {
    let mut source = SourceFile::default();

    for line in content.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix('#') else {
            continue;
        };
        let Some(rest) = rest.trim_start().strip_prefix("include") else {
            continue;
        };

        let rest = rest.trim_start();
        if let Some(stripped) = rest.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                if end > 0 {
                    source.include_deps.push(stripped[..end].to_string());
                }
            }
        }
        // Angle-bracket includes are intentionally ignored.
    }

    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_quoted_includes() {
        let source = parse_c_str(
            "#include \"defs.h\"\n\
             #include <stdio.h>\n\
             # include \"util/helpers.h\"\n\
             int main(void) { return 0; }\n",
        );
        assert_eq!(source.include_deps, vec!["defs.h", "util/helpers.h"]);
    }

    #[test]
    fn test_unit_kind_from_extension() {
        assert_eq!(
            unit_kind_from_extension(Path::new("a.c")),
            UnitKind::CSource
        );
        assert_eq!(
            unit_kind_from_extension(Path::new("a.h")),
            UnitKind::CHeader
        );
        assert_eq!(
            unit_kind_from_extension(Path::new("a.cpp")),
            UnitKind::CppSource
        );
        assert_eq!(
            unit_kind_from_extension(Path::new("a.hpp")),
            UnitKind::CHeader
        );
    }

    #[test]
    fn test_parse_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("native.c");
        std::fs::write(&path, "#include \"defs.h\"\nint f(void) { return 1; }\n").unwrap();

        let source = parse_c_file(&path).unwrap();
        assert_eq!(source.unit_kind, UnitKind::CSource);
        assert_eq!(source.include_deps, vec!["defs.h"]);
        assert_ne!(source.digest, 0);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_c_file(&PathBuf::from("/no/such/file.c")).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
