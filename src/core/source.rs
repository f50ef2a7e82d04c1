//! Parsed source files - the leaves of the build model.
//!
//! A `SourceFile` is the result of lightly parsing one file on disk: enough
//! structure to wire up module dependencies and decide staleness, nothing
//! close to semantic analysis.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// The kind of compilation unit a source file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitKind {
    /// A Fortran `program` unit (executable entry point).
    Program,
    /// A file containing only Fortran module definitions (tree-shakeable).
    Module,
    /// A Fortran `submodule` extending a parent module.
    Submodule,
    /// Modules mixed with other top-level content, or bare procedures.
    Subprogram,
    /// A C source file.
    CSource,
    /// A C header.
    CHeader,
    /// A C++ source file.
    CppSource,
    /// Not yet classified.
    #[default]
    Unknown,
}

impl UnitKind {
    /// Get the unit kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Program => "program",
            UnitKind::Module => "module",
            UnitKind::Submodule => "submodule",
            UnitKind::Subprogram => "subprogram",
            UnitKind::CSource => "c-source",
            UnitKind::CHeader => "c-header",
            UnitKind::CppSource => "c++-source",
            UnitKind::Unknown => "unknown",
        }
    }

    /// Whether this unit compiles to an object file.
    pub fn is_compiled(&self) -> bool {
        !matches!(self, UnitKind::CHeader | UnitKind::Unknown)
    }
}

/// Where a source file sits in its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Library sources of any package.
    Lib,
    /// Non-library sources of a dependency package; never built.
    Dep,
    /// Application sources of the root package.
    App,
    /// Test sources of the root package.
    Test,
    /// Example sources of the root package.
    Example,
    /// Not yet assigned.
    #[default]
    Unknown,
}

impl Scope {
    /// Get the scope as a string (also the output subdirectory name for
    /// executable scopes).
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Lib => "lib",
            Scope::Dep => "dep",
            Scope::App => "app",
            Scope::Test => "test",
            Scope::Example => "example",
            Scope::Unknown => "unknown",
        }
    }
}

/// Fortran modules provided by the compiler or runtime; never tracked as
/// build dependencies.
pub const INTRINSIC_MODULES: &[&str] = &[
    "iso_c_binding",
    "iso_fortran_env",
    "ieee_arithmetic",
    "ieee_exceptions",
    "ieee_features",
    "omp_lib",
    "omp_lib_kinds",
];

/// Check whether a lowercased module name is intrinsic.
pub fn is_intrinsic_module(name: &str) -> bool {
    INTRINSIC_MODULES.contains(&name)
}

/// One parsed source file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    /// Canonical path on disk.
    pub path: PathBuf,

    /// Kind of compilation unit.
    pub unit_kind: UnitKind,

    /// Position within its package.
    pub scope: Scope,

    /// Lowercase names of modules this file defines.
    pub provided_modules: BTreeSet<String>,

    /// Lowercase names of modules this file uses (intrinsics excluded).
    pub used_modules: BTreeSet<String>,

    /// Parent module chain for submodules (parent first).
    pub parent_modules: Vec<String>,

    /// File names pulled in by quoted `include` / `#include` directives.
    pub include_deps: Vec<String>,

    /// Executable name; present only for `Program` units.
    pub exe_name: Option<String>,

    /// Native libraries to link when this unit becomes an executable.
    pub link_libraries: Vec<String>,

    /// Content digest of the file (normalized FNV-1a).
    pub digest: u64,
}

impl SourceFile {
    /// Modules this file actually depends on for compilation: used modules
    /// plus, for submodules, the parent chain.
    pub fn module_dependencies(&self) -> impl Iterator<Item = &String> {
        self.used_modules.iter().chain(self.parent_modules.iter())
    }

    /// A short display name: file name without directories.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_set() {
        assert!(is_intrinsic_module("iso_c_binding"));
        assert!(is_intrinsic_module("iso_fortran_env"));
        assert!(is_intrinsic_module("omp_lib"));
        assert!(!is_intrinsic_module("mylib_core"));
    }

    #[test]
    fn test_module_dependencies_include_parents() {
        let mut source = SourceFile {
            path: PathBuf::from("src/impl.f90"),
            unit_kind: UnitKind::Submodule,
            parent_modules: vec!["core".to_string()],
            ..Default::default()
        };
        source.used_modules.insert("helpers".to_string());

        let deps: Vec<&String> = source.module_dependencies().collect();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().any(|m| *m == "helpers"));
        assert!(deps.iter().any(|m| *m == "core"));
    }

    #[test]
    fn test_headers_are_not_compiled() {
        assert!(!UnitKind::CHeader.is_compiled());
        assert!(!UnitKind::Unknown.is_compiled());
        assert!(UnitKind::Module.is_compiled());
        assert!(UnitKind::CSource.is_compiled());
    }
}
