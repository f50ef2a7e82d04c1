//! Package - a resolvable unit with manifest and parsed sources.

use std::path::PathBuf;

use anyhow::Result;
use semver::Version;

use crate::core::manifest::{LibraryKind, Manifest, PreprocessSection, SourceForm};
use crate::core::source::SourceFile;

/// Fortran dialect features that turn into compiler flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct FortranFeatures {
    pub implicit_typing: bool,
    pub implicit_external: bool,
    pub source_form: SourceForm,
}

/// A complete package: manifest plus parsed sources.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name.
    pub name: String,

    /// Package version.
    pub version: Version,

    /// Root directory of the package.
    pub root: PathBuf,

    /// The parsed manifest.
    pub manifest: Manifest,

    /// All parsed sources, library and executable scopes alike.
    pub sources: Vec<SourceFile>,

    /// Fortran dialect features.
    pub features: FortranFeatures,

    /// Whether provided module names must carry the package prefix.
    pub enforce_module_names: bool,

    /// The enforced module prefix.
    pub module_prefix: String,
}

impl Package {
    /// Create a package from a loaded manifest; sources are filled in by the
    /// assembler.
    pub fn new(manifest: Manifest, root: PathBuf) -> Result<Self> {
        let version = manifest.version()?;
        let features = FortranFeatures {
            implicit_typing: manifest.fortran.implicit_typing,
            implicit_external: manifest.fortran.implicit_external,
            source_form: manifest.fortran.source_form,
        };

        Ok(Package {
            name: manifest.name.clone(),
            version,
            enforce_module_names: manifest.build.module_naming,
            module_prefix: manifest.module_prefix(),
            features,
            sources: Vec::new(),
            manifest,
            root,
        })
    }

    /// Preprocessor settings for the `cpp` preprocessor, if enabled.
    pub fn preprocess(&self) -> Option<&PreprocessSection> {
        self.manifest.preprocess.get("cpp")
    }

    /// Extra Fortran suffixes routed through the preprocessor.
    pub fn preprocessed_suffixes(&self) -> Vec<String> {
        self.preprocess()
            .map(|p| p.suffixes.clone())
            .unwrap_or_default()
    }

    /// Include directories declared by this package, as absolute paths.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(lib) = &self.manifest.library {
            for dir in &lib.include_dir {
                dirs.push(self.root.join(dir));
            }
        }
        if let Some(pp) = self.preprocess() {
            for dir in &pp.directories {
                dirs.push(self.root.join(dir));
            }
        }
        dirs
    }

    /// Whether the library is declared shared.
    pub fn shared_library(&self) -> bool {
        self.manifest
            .library
            .as_ref()
            .map(|l| l.kind == LibraryKind::Shared)
            .unwrap_or(false)
    }

    /// The library source directory, if the package has a library.
    pub fn library_dir(&self) -> Option<PathBuf> {
        self.manifest
            .library
            .as_ref()
            .map(|l| self.root.join(&l.source_dir))
    }

    /// Names of this package's declared dependencies.
    pub fn dependency_names(&self) -> impl Iterator<Item = &String> {
        self.manifest.dependencies.keys()
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for Package {}
