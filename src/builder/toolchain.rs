//! Toolchain abstraction for Fortran, C, and C++ compilers.
//!
//! Vendor differences are isolated behind the [`FlagSet`] trait; one
//! implementation is chosen when the [`Compiler`] is constructed, so the
//! executor never branches on vendor.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::SourceForm;
use crate::core::model::Profile;
use crate::core::package::FortranFeatures;
use crate::util::process::ProcessBuilder;

/// Compiler vendor, identified from version output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerVendor {
    Gcc,
    IntelClassic,
    IntelLlvm,
    Nvhpc,
    Nag,
    LFortran,
    FlangLlvm,
    IbmXl,
    Cray,
    Unknown,
}

impl CompilerVendor {
    /// Get the vendor name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerVendor::Gcc => "gcc",
            CompilerVendor::IntelClassic => "intel-classic",
            CompilerVendor::IntelLlvm => "intel-llvm",
            CompilerVendor::Nvhpc => "nvhpc",
            CompilerVendor::Nag => "nag",
            CompilerVendor::LFortran => "lfortran",
            CompilerVendor::FlangLlvm => "flang-llvm",
            CompilerVendor::IbmXl => "ibm-xl",
            CompilerVendor::Cray => "cray",
            CompilerVendor::Unknown => "unknown",
        }
    }

    /// Match version output against known vendor banners.
    pub fn from_version_output(output: &str) -> Self {
        let lowered = output.to_lowercase();

        if lowered.contains("gnu fortran") {
            CompilerVendor::Gcc
        } else if lowered.contains("classic") && lowered.contains("intel") {
            CompilerVendor::IntelClassic
        } else if lowered.contains("ifort") {
            CompilerVendor::IntelClassic
        } else if lowered.contains("intel") || lowered.contains("ifx") {
            CompilerVendor::IntelLlvm
        } else if lowered.contains("nvfortran") || lowered.contains("pgi") {
            CompilerVendor::Nvhpc
        } else if lowered.contains("nag fortran") {
            CompilerVendor::Nag
        } else if lowered.contains("lfortran") {
            CompilerVendor::LFortran
        } else if lowered.contains("flang") {
            CompilerVendor::FlangLlvm
        } else if lowered.contains("ibm xl") || lowered.contains("xlf") {
            CompilerVendor::IbmXl
        } else if lowered.contains("cray fortran") {
            CompilerVendor::Cray
        } else {
            CompilerVendor::Unknown
        }
    }
}

/// A Fortran dialect feature that maps to vendor flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FortranFeature {
    AllowImplicitTyping,
    NoImplicitTyping,
    AllowImplicitExternal,
    NoImplicitExternal,
    FreeForm,
    FixedForm,
}

/// Vendor-specific flag tables.
pub trait FlagSet: Send + Sync + std::fmt::Debug {
    /// Flag tokens directing `.mod` output into `dir`.
    fn module_output_flag(&self, dir: &Path) -> Vec<String>;

    /// Flag tokens adding `dir` to the include/module search path.
    fn include_flag(&self, dir: &Path) -> Vec<String> {
        vec![format!("-I{}", dir.display())]
    }

    /// Flag tokens enabling a dialect feature.
    fn feature_flag(&self, feature: FortranFeature) -> Vec<String>;

    /// Default Fortran flags for a profile.
    fn default_flags(&self, profile: Profile) -> Vec<String>;

    /// Flags appended when the program unit is C/C++ but the Fortran
    /// compiler drives the link.
    fn nonlanguage_main_flags(&self) -> Vec<String> {
        Vec::new()
    }
}

/// GNU (gfortran) flags.
#[derive(Debug)]
pub struct GnuFlags;

impl FlagSet for GnuFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        vec!["-J".to_string(), dir.display().to_string()]
    }

    fn feature_flag(&self, feature: FortranFeature) -> Vec<String> {
        match feature {
            FortranFeature::NoImplicitTyping => vec!["-fimplicit-none".to_string()],
            FortranFeature::NoImplicitExternal => vec!["-Wimplicit-interface".to_string()],
            FortranFeature::FreeForm => vec!["-ffree-form".to_string()],
            FortranFeature::FixedForm => vec!["-ffixed-form".to_string()],
            _ => Vec::new(),
        }
    }

    fn default_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Release => vec!["-O3".to_string(), "-funroll-loops".to_string()],
            Profile::Debug => vec![
                "-g".to_string(),
                "-Wall".to_string(),
                "-Wextra".to_string(),
                "-fcheck=bounds".to_string(),
                "-fbacktrace".to_string(),
            ],
        }
    }
}

/// Intel (ifort/ifx) flags; the two generations share tables.
#[derive(Debug)]
pub struct IntelFlags;

impl FlagSet for IntelFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        vec!["-module".to_string(), dir.display().to_string()]
    }

    fn feature_flag(&self, feature: FortranFeature) -> Vec<String> {
        match feature {
            FortranFeature::NoImplicitTyping => vec!["-implicitnone".to_string()],
            FortranFeature::NoImplicitExternal => {
                vec!["-warn".to_string(), "interfaces".to_string()]
            }
            FortranFeature::FreeForm => vec!["-free".to_string()],
            FortranFeature::FixedForm => vec!["-fixed".to_string()],
            _ => Vec::new(),
        }
    }

    fn default_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Release => vec!["-O3".to_string()],
            Profile::Debug => vec![
                "-O0".to_string(),
                "-g".to_string(),
                "-check".to_string(),
                "all".to_string(),
                "-traceback".to_string(),
            ],
        }
    }

    fn nonlanguage_main_flags(&self) -> Vec<String> {
        vec!["-nofor-main".to_string()]
    }
}

/// NVIDIA HPC (nvfortran) flags.
#[derive(Debug)]
pub struct NvhpcFlags;

impl FlagSet for NvhpcFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        vec!["-module".to_string(), dir.display().to_string()]
    }

    fn feature_flag(&self, feature: FortranFeature) -> Vec<String> {
        match feature {
            FortranFeature::NoImplicitTyping => vec!["-Mdclchk".to_string()],
            FortranFeature::FreeForm => vec!["-Mfree".to_string()],
            FortranFeature::FixedForm => vec!["-Mfixed".to_string()],
            _ => Vec::new(),
        }
    }

    fn default_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Release => vec!["-fast".to_string()],
            Profile::Debug => vec![
                "-g".to_string(),
                "-Mbounds".to_string(),
                "-Mchkptr".to_string(),
            ],
        }
    }

    fn nonlanguage_main_flags(&self) -> Vec<String> {
        vec!["-Mnomain".to_string()]
    }
}

/// NAG Fortran flags.
#[derive(Debug)]
pub struct NagFlags;

impl FlagSet for NagFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        vec!["-mdir".to_string(), dir.display().to_string()]
    }

    fn feature_flag(&self, feature: FortranFeature) -> Vec<String> {
        match feature {
            FortranFeature::NoImplicitTyping => vec!["-u".to_string()],
            FortranFeature::FreeForm => vec!["-free".to_string()],
            FortranFeature::FixedForm => vec!["-fixed".to_string()],
            _ => Vec::new(),
        }
    }

    fn default_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Release => vec!["-O4".to_string()],
            Profile::Debug => vec!["-g".to_string(), "-C=all".to_string()],
        }
    }
}

/// LLVM flang flags.
#[derive(Debug)]
pub struct FlangFlags;

impl FlagSet for FlangFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        vec!["-module-dir".to_string(), dir.display().to_string()]
    }

    fn feature_flag(&self, feature: FortranFeature) -> Vec<String> {
        match feature {
            FortranFeature::FreeForm => vec!["-ffree-form".to_string()],
            FortranFeature::FixedForm => vec!["-ffixed-form".to_string()],
            _ => Vec::new(),
        }
    }

    fn default_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Release => vec!["-O2".to_string()],
            Profile::Debug => vec!["-g".to_string()],
        }
    }
}

/// IBM XL Fortran flags.
#[derive(Debug)]
pub struct IbmXlFlags;

impl FlagSet for IbmXlFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        vec![format!("-qmoddir={}", dir.display())]
    }

    fn feature_flag(&self, feature: FortranFeature) -> Vec<String> {
        match feature {
            FortranFeature::FreeForm => vec!["-qfree".to_string()],
            FortranFeature::FixedForm => vec!["-qfixed".to_string()],
            _ => Vec::new(),
        }
    }

    fn default_flags(&self, profile: Profile) -> Vec<String> {
        match profile {
            Profile::Release => vec!["-O2".to_string()],
            Profile::Debug => vec!["-g".to_string()],
        }
    }
}

/// Catch-all flags for LFortran, Cray, and unidentified compilers: a `-J`
/// style module flag where known, nothing speculative otherwise.
#[derive(Debug)]
pub struct GenericFlags {
    vendor: CompilerVendor,
}

impl FlagSet for GenericFlags {
    fn module_output_flag(&self, dir: &Path) -> Vec<String> {
        match self.vendor {
            CompilerVendor::LFortran | CompilerVendor::Cray => {
                vec!["-J".to_string(), dir.display().to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn feature_flag(&self, _feature: FortranFeature) -> Vec<String> {
        Vec::new()
    }

    fn default_flags(&self, _profile: Profile) -> Vec<String> {
        Vec::new()
    }
}

fn flag_set_for(vendor: CompilerVendor) -> Box<dyn FlagSet> {
    match vendor {
        CompilerVendor::Gcc => Box::new(GnuFlags),
        CompilerVendor::IntelClassic | CompilerVendor::IntelLlvm => Box::new(IntelFlags),
        CompilerVendor::Nvhpc => Box::new(NvhpcFlags),
        CompilerVendor::Nag => Box::new(NagFlags),
        CompilerVendor::FlangLlvm => Box::new(FlangFlags),
        CompilerVendor::IbmXl => Box::new(IbmXlFlags),
        vendor => Box::new(GenericFlags { vendor }),
    }
}

/// The compiler abstraction: one Fortran, one C, and one C++ compiler plus
/// the vendor flag set.
#[derive(Debug)]
pub struct Compiler {
    /// Fortran compiler path.
    pub fc: PathBuf,
    /// C compiler path.
    pub cc: PathBuf,
    /// C++ compiler path.
    pub cxx: PathBuf,
    vendor: CompilerVendor,
    flags: Box<dyn FlagSet>,
}

impl Compiler {
    /// Create a compiler, identifying the Fortran vendor by invoking it
    /// with version flags.
    pub fn new(fc: PathBuf, cc: PathBuf, cxx: PathBuf) -> Self {
        let vendor = identify(&fc);
        tracing::debug!(
            "identified {} as {} compiler",
            fc.display(),
            vendor.as_str()
        );
        Self::with_vendor(fc, cc, cxx, vendor)
    }

    /// Create a compiler with a known vendor (skips identification).
    pub fn with_vendor(fc: PathBuf, cc: PathBuf, cxx: PathBuf, vendor: CompilerVendor) -> Self {
        Compiler {
            fc,
            cc,
            cxx,
            vendor,
            flags: flag_set_for(vendor),
        }
    }

    /// The identified vendor.
    pub fn vendor(&self) -> CompilerVendor {
        self.vendor
    }

    /// Whether this is a GNU compiler.
    pub fn is_gnu(&self) -> bool {
        self.vendor == CompilerVendor::Gcc
    }

    /// Whether this is an Intel compiler of either generation.
    pub fn is_intel(&self) -> bool {
        matches!(
            self.vendor,
            CompilerVendor::IntelClassic | CompilerVendor::IntelLlvm
        )
    }

    /// Vendor flag table.
    pub fn flag_set(&self) -> &dyn FlagSet {
        self.flags.as_ref()
    }

    /// Flags for the package's Fortran dialect features.
    pub fn feature_flags(&self, features: &FortranFeatures) -> Vec<String> {
        let mut out = Vec::new();
        out.extend(self.flags.feature_flag(if features.implicit_typing {
            FortranFeature::AllowImplicitTyping
        } else {
            FortranFeature::NoImplicitTyping
        }));
        out.extend(self.flags.feature_flag(if features.implicit_external {
            FortranFeature::AllowImplicitExternal
        } else {
            FortranFeature::NoImplicitExternal
        }));
        match features.source_form {
            SourceForm::Free => out.extend(self.flags.feature_flag(FortranFeature::FreeForm)),
            SourceForm::Fixed => out.extend(self.flags.feature_flag(FortranFeature::FixedForm)),
            SourceForm::Default => {}
        }
        out
    }

    /// Build the compile command for a Fortran source.
    pub fn compile_fortran_command(&self, src: &Path, out: &Path, flags: &[String]) -> ProcessBuilder {
        ProcessBuilder::new(&self.fc)
            .arg("-c")
            .args(flags)
            .arg(src)
            .arg("-o")
            .arg(out)
    }

    /// Build the compile command for a C source.
    pub fn compile_c_command(&self, src: &Path, out: &Path, flags: &[String]) -> ProcessBuilder {
        ProcessBuilder::new(&self.cc)
            .arg("-c")
            .args(flags)
            .arg(src)
            .arg("-o")
            .arg(out)
    }

    /// Build the compile command for a C++ source.
    pub fn compile_cpp_command(&self, src: &Path, out: &Path, flags: &[String]) -> ProcessBuilder {
        ProcessBuilder::new(&self.cxx)
            .arg("-c")
            .args(flags)
            .arg(src)
            .arg("-o")
            .arg(out)
    }

    /// Build the link command for an executable. The Fortran compiler
    /// drives the link so the runtime libraries come along.
    pub fn link_executable_command(
        &self,
        objects: &[PathBuf],
        out: &Path,
        flags: &[String],
    ) -> ProcessBuilder {
        ProcessBuilder::new(&self.fc)
            .args(objects)
            .arg("-o")
            .arg(out)
            .args(flags)
    }

    /// Build the link command for a shared library.
    pub fn link_shared_command(
        &self,
        objects: &[PathBuf],
        out: &Path,
        flags: &[String],
    ) -> ProcessBuilder {
        ProcessBuilder::new(&self.fc)
            .arg("-shared")
            .args(objects)
            .arg("-o")
            .arg(out)
            .args(flags)
    }

    /// Compile a Fortran source, capturing output into `log`.
    pub fn compile_fortran(
        &self,
        src: &Path,
        out: &Path,
        flags: &[String],
        log: &Path,
    ) -> Result<(i32, String)> {
        self.compile_fortran_command(src, out, flags).exec_logged(log)
    }

    /// Compile a C source, capturing output into `log`.
    pub fn compile_c(
        &self,
        src: &Path,
        out: &Path,
        flags: &[String],
        log: &Path,
    ) -> Result<(i32, String)> {
        self.compile_c_command(src, out, flags).exec_logged(log)
    }

    /// Compile a C++ source, capturing output into `log`.
    pub fn compile_cpp(
        &self,
        src: &Path,
        out: &Path,
        flags: &[String],
        log: &Path,
    ) -> Result<(i32, String)> {
        self.compile_cpp_command(src, out, flags).exec_logged(log)
    }

    /// Link an executable, capturing output into `log`.
    pub fn link_executable(
        &self,
        objects: &[PathBuf],
        out: &Path,
        flags: &[String],
        log: &Path,
    ) -> Result<(i32, String)> {
        self.link_executable_command(objects, out, flags)
            .exec_logged(log)
    }

    /// Link a shared library, capturing output into `log`.
    pub fn link_shared(
        &self,
        objects: &[PathBuf],
        out: &Path,
        flags: &[String],
        log: &Path,
    ) -> Result<(i32, String)> {
        self.link_shared_command(objects, out, flags).exec_logged(log)
    }

    /// Probe whether the compiler accepts a set of flags by compiling an
    /// empty program with them.
    pub fn check_flags_supported(&self, tokens: &[String]) -> bool {
        let probe = || -> Result<bool> {
            let dir = tempfile::tempdir().context("failed to create probe directory")?;
            let src = dir.path().join("probe.f90");
            std::fs::write(&src, "program probe\nend program probe\n")?;
            let out = dir.path().join("probe.o");

            let output = self
                .compile_fortran_command(&src, &out, tokens)
                .exec()?;
            Ok(output.status.success())
        };

        match probe() {
            Ok(supported) => supported,
            Err(e) => {
                tracing::debug!("flag probe failed to run: {e}");
                false
            }
        }
    }
}

/// Identify a Fortran compiler by invoking it with version flags.
fn identify(fc: &Path) -> CompilerVendor {
    for flag in ["--version", "-V", "-version"] {
        let output = match ProcessBuilder::new(fc).arg(flag).exec() {
            Ok(output) => output,
            Err(_) => continue,
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let vendor = CompilerVendor::from_version_output(&text);
        if vendor != CompilerVendor::Unknown {
            return vendor;
        }
    }

    CompilerVendor::Unknown
}

/// The archiver abstraction.
#[derive(Debug, Clone)]
pub struct Archiver {
    /// Archiver path.
    pub ar: PathBuf,
}

impl Archiver {
    /// Create an archiver.
    pub fn new(ar: PathBuf) -> Self {
        Archiver { ar }
    }

    /// Create the archive, capturing output into `log`.
    ///
    /// With `use_response_file` the object list is routed through an
    /// `@file` argument, for invocations whose direct command line would
    /// exceed the platform limit.
    pub fn archive(
        &self,
        objects: &[PathBuf],
        out: &Path,
        use_response_file: bool,
        log: &Path,
    ) -> Result<(i32, String)> {
        if use_response_file {
            let mut response = tempfile::NamedTempFile::new()
                .context("failed to create archiver response file")?;
            for obj in objects {
                writeln!(response, "{}", obj.display())?;
            }
            response.flush()?;

            let cmd = ProcessBuilder::new(&self.ar)
                .arg("rcs")
                .arg(out)
                .arg(format!("@{}", response.path().display()));
            // The response file must outlive the archiver process.
            let result = cmd.exec_logged(log);
            drop(response);
            result
        } else {
            self.archive_command(objects, out).exec_logged(log)
        }
    }

    /// Build the archive command (direct form, no response file).
    pub fn archive_command(&self, objects: &[PathBuf], out: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.ar).arg("rcs").arg(out).args(objects)
    }
}

/// Whether an object list should go through a response file.
///
/// Windows caps command lines near 32K; Unix limits are far larger but a
/// big package's archive step can still reach them.
pub fn response_file_needed(objects: &[PathBuf]) -> bool {
    let limit = if cfg!(windows) { 30_000 } else { 1_000_000 };
    let total: usize = objects.iter().map(|o| o.as_os_str().len() + 1).sum();
    total > limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gnu_compiler() -> Compiler {
        Compiler::with_vendor(
            PathBuf::from("gfortran"),
            PathBuf::from("gcc"),
            PathBuf::from("g++"),
            CompilerVendor::Gcc,
        )
    }

    #[test]
    fn test_vendor_identification_from_banners() {
        assert_eq!(
            CompilerVendor::from_version_output("GNU Fortran (GCC) 13.2.0"),
            CompilerVendor::Gcc
        );
        assert_eq!(
            CompilerVendor::from_version_output(
                "Intel(R) Fortran Intel(R) 64 Compiler Classic for applications"
            ),
            CompilerVendor::IntelClassic
        );
        assert_eq!(
            CompilerVendor::from_version_output("Intel(R) Fortran Compiler for applications (ifx)"),
            CompilerVendor::IntelLlvm
        );
        assert_eq!(
            CompilerVendor::from_version_output("nvfortran 24.1-0"),
            CompilerVendor::Nvhpc
        );
        assert_eq!(
            CompilerVendor::from_version_output("NAG Fortran Compiler Release 7.1"),
            CompilerVendor::Nag
        );
        assert_eq!(
            CompilerVendor::from_version_output("LFortran version 0.30.0"),
            CompilerVendor::LFortran
        );
        assert_eq!(
            CompilerVendor::from_version_output("flang-new version 18.1.0"),
            CompilerVendor::FlangLlvm
        );
        assert_eq!(
            CompilerVendor::from_version_output("Cray Fortran : Version 17.0"),
            CompilerVendor::Cray
        );
        assert_eq!(
            CompilerVendor::from_version_output("mystery compiler 1.0"),
            CompilerVendor::Unknown
        );
    }

    #[test]
    fn test_vendor_predicates() {
        assert!(gnu_compiler().is_gnu());
        assert!(!gnu_compiler().is_intel());

        let intel = Compiler::with_vendor(
            PathBuf::from("ifx"),
            PathBuf::from("icx"),
            PathBuf::from("icpx"),
            CompilerVendor::IntelLlvm,
        );
        assert!(intel.is_intel());
        assert!(!intel.is_gnu());
    }

    #[test]
    fn test_module_output_flags_per_vendor() {
        let dir = Path::new("/build/pkg");
        assert_eq!(
            GnuFlags.module_output_flag(dir),
            vec!["-J".to_string(), "/build/pkg".to_string()]
        );
        assert_eq!(
            IntelFlags.module_output_flag(dir),
            vec!["-module".to_string(), "/build/pkg".to_string()]
        );
        assert_eq!(
            NagFlags.module_output_flag(dir),
            vec!["-mdir".to_string(), "/build/pkg".to_string()]
        );
        assert_eq!(
            IbmXlFlags.module_output_flag(dir),
            vec!["-qmoddir=/build/pkg".to_string()]
        );
    }

    #[test]
    fn test_feature_flags() {
        let compiler = gnu_compiler();
        let features = FortranFeatures {
            implicit_typing: false,
            implicit_external: false,
            source_form: SourceForm::Free,
        };

        let flags = compiler.feature_flags(&features);
        assert!(flags.contains(&"-fimplicit-none".to_string()));
        assert!(flags.contains(&"-Wimplicit-interface".to_string()));
        assert!(flags.contains(&"-ffree-form".to_string()));

        let permissive = FortranFeatures {
            implicit_typing: true,
            implicit_external: true,
            source_form: SourceForm::Default,
        };
        assert!(compiler.feature_flags(&permissive).is_empty());
    }

    #[test]
    fn test_compile_command_shape() {
        let compiler = gnu_compiler();
        let cmd = compiler.compile_fortran_command(
            Path::new("src/m.f90"),
            Path::new("build/m.o"),
            &["-O3".to_string()],
        );

        assert_eq!(
            cmd.tokens(),
            vec!["gfortran", "-c", "-O3", "src/m.f90", "-o", "build/m.o"]
        );
    }

    #[test]
    fn test_link_command_shape() {
        let compiler = gnu_compiler();
        let cmd = compiler.link_executable_command(
            &[PathBuf::from("a.o"), PathBuf::from("libp.a")],
            Path::new("app/solve"),
            &["-lm".to_string()],
        );

        assert_eq!(
            cmd.tokens(),
            vec!["gfortran", "a.o", "libp.a", "-o", "app/solve", "-lm"]
        );
    }

    #[test]
    fn test_archive_command_shape() {
        let archiver = Archiver::new(PathBuf::from("ar"));
        let cmd = archiver.archive_command(
            &[PathBuf::from("a.o"), PathBuf::from("b.o")],
            Path::new("libp.a"),
        );
        assert_eq!(cmd.tokens(), vec!["ar", "rcs", "libp.a", "a.o", "b.o"]);
    }

    #[test]
    fn test_response_file_threshold() {
        let few = vec![PathBuf::from("build/pkg/m.o"); 8];
        assert!(!response_file_needed(&few));

        // A synthetic object list long enough to overflow any platform's
        // command line.
        let many = vec![PathBuf::from("x".repeat(600)); 2_000];
        assert!(response_file_needed(&many));
    }

    #[test]
    fn test_nonlanguage_main_flags() {
        assert_eq!(IntelFlags.nonlanguage_main_flags(), vec!["-nofor-main"]);
        assert_eq!(NvhpcFlags.nonlanguage_main_flags(), vec!["-Mnomain"]);
        assert!(GnuFlags.nonlanguage_main_flags().is_empty());
    }

    #[test]
    fn test_default_flags_differ_by_profile() {
        let release = GnuFlags.default_flags(Profile::Release);
        let debug = GnuFlags.default_flags(Profile::Debug);
        assert!(release.contains(&"-O3".to_string()));
        assert!(debug.contains(&"-fcheck=bounds".to_string()));
        assert_ne!(release, debug);
    }
}
