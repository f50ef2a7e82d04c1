//! Manifest parsing for fathom.toml.
//!
//! The manifest is the declarative description of one package: its library,
//! executables, dependencies, Fortran dialect features, and preprocessor
//! settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::diagnostic::BuildError;

/// The manifest file name.
pub const MANIFEST_NAME: &str = "fathom.toml";

/// A parsed fathom.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Manifest {
    /// Package name.
    pub name: String,

    /// Package version (semver, at most three components).
    pub version: String,

    /// Library section, if the package has one.
    #[serde(default)]
    pub library: Option<LibrarySection>,

    /// Explicit executables.
    #[serde(default, rename = "executable")]
    pub executables: Vec<ExecutableSection>,

    /// Explicit test executables.
    #[serde(default, rename = "test")]
    pub tests: Vec<ExecutableSection>,

    /// Explicit example executables.
    #[serde(default, rename = "example")]
    pub examples: Vec<ExecutableSection>,

    /// Path dependencies.
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,

    /// Build behavior switches.
    #[serde(default)]
    pub build: BuildSection,

    /// Fortran dialect features.
    #[serde(default)]
    pub fortran: FortranSection,

    /// Preprocessor configuration, keyed by preprocessor name (only "cpp"
    /// is recognized).
    #[serde(default)]
    pub preprocess: BTreeMap<String, PreprocessSection>,
}

/// Library declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LibrarySection {
    /// Directory holding library sources.
    #[serde(default = "default_lib_dir")]
    pub source_dir: PathBuf,

    /// Extra include directories exported to dependents.
    #[serde(default)]
    pub include_dir: Vec<PathBuf>,

    /// Library kind: "static" (default) or "shared".
    #[serde(default)]
    pub kind: LibraryKind,
}

fn default_lib_dir() -> PathBuf {
    PathBuf::from("src")
}

impl Default for LibrarySection {
    fn default() -> Self {
        LibrarySection {
            source_dir: default_lib_dir(),
            include_dir: Vec::new(),
            kind: LibraryKind::default(),
        }
    }
}

/// How the package library is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// Static archive (default).
    #[default]
    Static,
    /// Shared library (with an import-library sibling on Windows).
    Shared,
}

/// An explicit executable, test, or example entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ExecutableSection {
    /// Executable name.
    pub name: String,

    /// Directory holding this executable's sources.
    #[serde(default = "default_app_dir")]
    pub source_dir: PathBuf,

    /// Main file, relative to `source_dir`.
    #[serde(default = "default_main")]
    pub main: PathBuf,

    /// Native libraries to link.
    #[serde(default)]
    pub link: Vec<String>,
}

fn default_app_dir() -> PathBuf {
    PathBuf::from("app")
}

fn default_main() -> PathBuf {
    PathBuf::from("main.f90")
}

/// A dependency declaration. Only path dependencies are resolved locally;
/// git/registry sources are fetched by an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DependencySpec {
    /// Path to the dependency package, relative to this manifest.
    pub path: PathBuf,
}

/// Build behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildSection {
    /// Discover programs under app/ automatically.
    #[serde(default = "default_true")]
    pub auto_executables: bool,

    /// Discover programs under test/ automatically.
    #[serde(default = "default_true")]
    pub auto_tests: bool,

    /// Discover programs under example/ automatically.
    #[serde(default = "default_true")]
    pub auto_examples: bool,

    /// Modules assumed to be provided outside the build model.
    #[serde(default)]
    pub external_modules: Vec<String>,

    /// Native libraries linked into every executable of this package.
    #[serde(default)]
    pub link: Vec<String>,

    /// Enforce that provided module names carry the package prefix.
    #[serde(default)]
    pub module_naming: bool,

    /// Override for the enforced module prefix; defaults to the package
    /// name with dashes replaced by underscores.
    #[serde(default)]
    pub module_prefix: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for BuildSection {
    fn default() -> Self {
        BuildSection {
            auto_executables: true,
            auto_tests: true,
            auto_examples: true,
            external_modules: Vec::new(),
            link: Vec::new(),
            module_naming: false,
            module_prefix: None,
        }
    }
}

/// Fortran dialect features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FortranSection {
    /// Allow implicit typing.
    #[serde(default)]
    pub implicit_typing: bool,

    /// Allow implicit external interfaces.
    #[serde(default)]
    pub implicit_external: bool,

    /// Source form: "free", "fixed", or "default" (by extension).
    #[serde(default)]
    pub source_form: SourceForm,
}

impl Default for FortranSection {
    fn default() -> Self {
        FortranSection {
            implicit_typing: false,
            implicit_external: false,
            source_form: SourceForm::default(),
        }
    }
}

/// Fortran source form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceForm {
    /// Free-form source.
    Free,
    /// Fixed-form source.
    Fixed,
    /// Decide per file from the extension.
    #[default]
    Default,
}

/// Preprocessor configuration for one preprocessor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PreprocessSection {
    /// Macro definitions, `NAME` or `NAME=VALUE`.
    #[serde(default)]
    pub macros: Vec<String>,

    /// Include directories, relative to the package root.
    #[serde(default)]
    pub directories: Vec<PathBuf>,

    /// Extra source suffixes to treat as preprocessed Fortran.
    #[serde(default)]
    pub suffixes: Vec<String>,
}

impl Manifest {
    /// Load and validate a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BuildError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        let manifest: Manifest = toml::from_str(&content)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse the declared version.
    pub fn version(&self) -> Result<semver::Version> {
        // Accept one- and two-component versions by padding with zeros.
        let mut parts = self.version.split('.');
        let text = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(major), None, _, _) => format!("{major}.0.0"),
            (Some(major), Some(minor), None, _) => format!("{major}.{minor}.0"),
            (_, _, _, Some(_)) => {
                return Err(BuildError::Manifest {
                    package: self.name.clone(),
                    message: format!("version `{}` has more than three components", self.version),
                }
                .into())
            }
            _ => self.version.clone(),
        };

        semver::Version::parse(&text).map_err(|e| {
            BuildError::Manifest {
                package: self.name.clone(),
                message: format!("invalid version `{}`: {}", self.version, e),
            }
            .into()
        })
    }

    /// The module prefix enforced when `module-naming` is set.
    pub fn module_prefix(&self) -> String {
        self.build
            .module_prefix
            .clone()
            .unwrap_or_else(|| self.name.replace('-', "_"))
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(BuildError::Manifest {
                package: "<unnamed>".to_string(),
                message: "package name must not be empty".to_string(),
            }
            .into());
        }

        self.version()?;

        let mut seen = std::collections::BTreeSet::new();
        for exe in self
            .executables
            .iter()
            .chain(self.tests.iter())
            .chain(self.examples.iter())
        {
            if exe.name.is_empty() {
                return Err(BuildError::Manifest {
                    package: self.name.clone(),
                    message: "executable name must not be empty".to_string(),
                }
                .into());
            }
            if !seen.insert(exe.name.clone()) {
                return Err(BuildError::Manifest {
                    package: self.name.clone(),
                    message: format!("duplicate executable name `{}`", exe.name),
                }
                .into());
            }
        }

        for name in self.preprocess.keys() {
            if name != "cpp" {
                return Err(BuildError::Manifest {
                    package: self.name.clone(),
                    message: format!("unknown preprocessor `{name}` (only `cpp` is supported)"),
                }
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(MANIFEST_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_minimal_manifest() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
name = "linalg"
version = "0.2.1"
"#,
        );

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.name, "linalg");
        assert_eq!(manifest.version().unwrap(), semver::Version::new(0, 2, 1));
        assert!(manifest.build.auto_executables);
        assert!(!manifest.fortran.implicit_typing);
    }

    #[test]
    fn test_full_manifest() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
name = "solver"
version = "1.0"

[library]
source-dir = "lib"
kind = "shared"

[[executable]]
name = "solve"
source-dir = "app"
main = "solve.f90"
link = ["lapack", "blas"]

[[test]]
name = "unit"
source-dir = "test"
main = "unit.f90"

[dependencies]
linalg = { path = "../linalg" }

[build]
auto-executables = false
external-modules = ["mpi"]
module-naming = true

[fortran]
implicit-typing = true
source-form = "fixed"

[preprocess.cpp]
macros = ["WITH_MPI", "MAX_RANK=4"]
directories = ["include"]
suffixes = [".F90"]
"#,
        );

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.version().unwrap(), semver::Version::new(1, 0, 0));
        assert_eq!(manifest.library.as_ref().unwrap().kind, LibraryKind::Shared);
        assert_eq!(manifest.executables[0].link, vec!["lapack", "blas"]);
        assert_eq!(manifest.tests[0].name, "unit");
        assert!(manifest.dependencies.contains_key("linalg"));
        assert!(!manifest.build.auto_executables);
        assert_eq!(manifest.build.external_modules, vec!["mpi"]);
        assert_eq!(manifest.fortran.source_form, SourceForm::Fixed);
        assert_eq!(manifest.preprocess["cpp"].macros.len(), 2);
        assert_eq!(manifest.module_prefix(), "solver");
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let err = Manifest::load(&tmp.path().join(MANIFEST_NAME)).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_four_component_version_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(tmp.path(), "name = \"p\"\nversion = \"1.2.3.4\"\n");
        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("more than three components"));
    }

    #[test]
    fn test_duplicate_executable_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
name = "p"
version = "1.0.0"

[[executable]]
name = "a"

[[test]]
name = "a"
"#,
        );
        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate executable name"));
    }

    #[test]
    fn test_unknown_preprocessor_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
name = "p"
version = "1.0.0"

[preprocess.fypp]
macros = ["X"]
"#,
        );
        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("unknown preprocessor"));
    }

    #[test]
    fn test_module_prefix_override() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(
            tmp.path(),
            r#"
name = "fast-solver"
version = "1.0.0"

[build]
module-naming = true
module-prefix = "fs"
"#,
        );
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.module_prefix(), "fs");
    }

    #[test]
    fn test_default_prefix_replaces_dashes() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest(tmp.path(), "name = \"fast-solver\"\nversion = \"1.0.0\"\n");
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.module_prefix(), "fast_solver");
    }
}
