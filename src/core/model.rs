//! The build model - the closed world handed to the target builder.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::builder::toolchain::{Archiver, Compiler};
use crate::core::package::Package;

/// Build profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Optimized build (default).
    #[default]
    Release,
    /// Debug build with checks enabled.
    Debug,
}

impl Profile {
    /// Get the profile name (also the build subdirectory name).
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Release => "release",
            Profile::Debug => "debug",
        }
    }
}

/// Everything the target builder needs: packages, tools, flags, and layout.
#[derive(Debug)]
pub struct BuildModel {
    /// Name of the root package.
    pub root_package_name: String,

    /// Root first, then dependencies in resolution order.
    pub packages: Vec<Package>,

    /// The compiler abstraction.
    pub compiler: Compiler,

    /// The archiver abstraction.
    pub archiver: Archiver,

    /// Build profile.
    pub profile: Profile,

    /// Global Fortran compile flags.
    pub fortran_flags: Vec<String>,

    /// Global C compile flags.
    pub c_flags: Vec<String>,

    /// Global C++ compile flags.
    pub cxx_flags: Vec<String>,

    /// Global link flags.
    pub link_flags: Vec<String>,

    /// Root directory for all outputs.
    pub build_prefix: PathBuf,

    /// Extra include directories applied to every compile.
    pub include_dirs: Vec<PathBuf>,

    /// Native libraries linked into every executable.
    pub link_libraries: Vec<String>,

    /// Modules assumed provided outside the model.
    pub external_modules: BTreeSet<String>,

    /// Whether test-scope sources are built.
    pub include_tests: bool,
}

impl BuildModel {
    /// The root package.
    pub fn root_package(&self) -> &Package {
        // Construction guarantees the root is first.
        &self.packages[0]
    }

    /// Find a package by name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// The output directory for one package's objects and modules.
    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.build_prefix.join(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names() {
        assert_eq!(Profile::Release.as_str(), "release");
        assert_eq!(Profile::Debug.as_str(), "debug");
        assert_eq!(Profile::default(), Profile::Release);
    }
}
