//! Package assembly - from manifests and source trees to `Package` records.
//!
//! Resolves the local path-dependency graph, scans and parses every relevant
//! source directory, assigns scopes, and validates module naming. The result
//! feeds the target builder.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::{ExecutableSection, Manifest};
use crate::core::package::Package;
use crate::core::source::{Scope, SourceFile, UnitKind};
use crate::sources::scanner::{scan_directory, ScanFilter};
use crate::sources::parse_source;
use crate::util::diagnostic::BuildError;
use crate::util::fs::normalize_path;

/// Assemble the root package and all path dependencies, root first.
pub fn assemble_packages(manifest_path: &Path, include_tests: bool) -> Result<Vec<Package>> {
    let mut packages = resolve_packages(manifest_path)?;

    for index in 0..packages.len() {
        let is_root = index == 0;
        populate_sources(&mut packages[index], is_root, include_tests)?;
    }

    validate_module_names(&packages)?;
    Ok(packages)
}

/// Resolve the path-dependency graph by depth-first traversal.
///
/// The root comes first, then dependencies in first-encounter order. A
/// package name already resolved is reused (first occurrence wins); a cycle
/// in the package graph is fatal.
fn resolve_packages(manifest_path: &Path) -> Result<Vec<Package>> {
    let mut packages: Vec<Package> = Vec::new();
    let mut resolved: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut visiting: Vec<String> = Vec::new();

    fn visit(
        manifest_path: &Path,
        packages: &mut Vec<Package>,
        resolved: &mut BTreeMap<String, PathBuf>,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        let manifest = Manifest::load(manifest_path)?;
        let root = normalize_path(manifest_path.parent().unwrap_or(Path::new(".")));

        if visiting.contains(&manifest.name) {
            let mut names = visiting.clone();
            names.push(manifest.name.clone());
            return Err(BuildError::Cycle { names }.into());
        }

        if let Some(existing) = resolved.get(&manifest.name) {
            if *existing != root {
                tracing::warn!(
                    "package `{}` resolved from {} shadows the copy at {}",
                    manifest.name,
                    existing.display(),
                    root.display()
                );
            }
            return Ok(());
        }

        visiting.push(manifest.name.clone());
        resolved.insert(manifest.name.clone(), root.clone());

        let package = Package::new(manifest, root.clone())?;
        let deps: Vec<PathBuf> = package
            .manifest
            .dependencies
            .values()
            .map(|spec| root.join(&spec.path).join(crate::core::manifest::MANIFEST_NAME))
            .collect();
        packages.push(package);

        for dep_manifest in deps {
            visit(&dep_manifest, packages, resolved, visiting)?;
        }

        visiting.pop();
        Ok(())
    }

    visit(manifest_path, &mut packages, &mut resolved, &mut visiting)?;
    Ok(packages)
}

/// Scan and parse all source directories of one package.
fn populate_sources(package: &mut Package, is_root: bool, include_tests: bool) -> Result<()> {
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    let mut sources: Vec<SourceFile> = Vec::new();
    let suffixes = package.preprocessed_suffixes();

    // Library sources: declared directory, or a discoverable src/.
    let lib_dir = package
        .library_dir()
        .or_else(|| {
            let default = package.root.join("src");
            default.is_dir().then_some(default)
        });

    if let Some(dir) = lib_dir {
        let filter = ScanFilter::all(&suffixes);
        for path in scan_directory(&dir, &filter, true, &mut seen) {
            let mut source = parse_source(&path)?;
            source.scope = Scope::Lib;
            sources.push(source);
        }
    }

    // Explicit executables are parsed first so their manifest-declared names
    // and libraries win over auto-discovery.
    let manifest = package.manifest.clone();
    for (entries, scope) in [
        (&manifest.executables, Scope::App),
        (&manifest.tests, Scope::Test),
        (&manifest.examples, Scope::Example),
    ] {
        for entry in entries {
            if scope == Scope::Test && !include_tests {
                continue;
            }
            let source = parse_explicit_executable(package, entry, scope, is_root, &mut seen)?;
            sources.push(source);
        }
    }

    // Auto-discovered executable directories.
    let auto_dirs = [
        (manifest.build.auto_executables, "app", Scope::App),
        (manifest.build.auto_tests, "test", Scope::Test),
        (manifest.build.auto_examples, "example", Scope::Example),
    ];

    for (enabled, dir_name, scope) in auto_dirs {
        if !enabled || (scope == Scope::Test && !include_tests) {
            continue;
        }
        let dir = package.root.join(dir_name);
        let filter = ScanFilter::all(&suffixes);
        for path in scan_directory(&dir, &filter, true, &mut seen) {
            let mut source = parse_source(&path)?;
            source.scope = executable_scope(scope, is_root);
            if source.unit_kind == UnitKind::Program {
                source.link_libraries = manifest.build.link.clone();
            }
            sources.push(source);
        }
    }

    package.sources = sources;
    Ok(())
}

/// Parse the main file of an explicit `[[executable]]`-style entry.
fn parse_explicit_executable(
    package: &Package,
    entry: &ExecutableSection,
    scope: Scope,
    is_root: bool,
    seen: &mut BTreeSet<PathBuf>,
) -> Result<SourceFile> {
    let main = package.root.join(&entry.source_dir).join(&entry.main);
    if !main.is_file() {
        return Err(BuildError::FileNotFound { path: main }.into());
    }

    let canonical = normalize_path(&main);
    seen.insert(canonical.clone());

    let mut source = parse_source(&canonical)?;
    source.scope = executable_scope(scope, is_root);

    // The manifest names the program; a mismatching or absent `program`
    // statement is not an error for C mains.
    match source.unit_kind {
        UnitKind::Program | UnitKind::CSource | UnitKind::CppSource => {}
        other => {
            return Err(BuildError::Manifest {
                package: package.name.clone(),
                message: format!(
                    "executable `{}` main file {} is a {} unit, not a program",
                    entry.name,
                    canonical.display(),
                    other.as_str()
                ),
            }
            .into())
        }
    }

    source.exe_name = Some(entry.name.clone());
    source.link_libraries = entry
        .link
        .iter()
        .chain(package.manifest.build.link.iter())
        .cloned()
        .collect();

    Ok(source)
}

/// Executable-scope sources of dependency packages are never built.
fn executable_scope(scope: Scope, is_root: bool) -> Scope {
    if is_root {
        scope
    } else {
        Scope::Dep
    }
}

/// Enforce module-name prefixes and warn about cross-package duplicates.
fn validate_module_names(packages: &[Package]) -> Result<()> {
    let mut providers: BTreeMap<&String, &str> = BTreeMap::new();

    for package in packages {
        for source in &package.sources {
            for module in &source.provided_modules {
                if package.enforce_module_names && !module.starts_with(&package.module_prefix) {
                    return Err(BuildError::Manifest {
                        package: package.name.clone(),
                        message: format!(
                            "module `{}` does not carry the enforced prefix `{}`",
                            module, package.module_prefix
                        ),
                    }
                    .into());
                }

                if let Some(previous) = providers.insert(module, package.name.as_str()) {
                    if previous != package.name {
                        tracing::warn!(
                            "module `{}` is provided by both `{}` and `{}`",
                            module,
                            previous,
                            package.name
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
