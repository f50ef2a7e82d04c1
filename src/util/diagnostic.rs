//! The build error taxonomy.
//!
//! Fatal errors ([`BuildError`]) abort the build and bubble up to the CLI;
//! their diagnostic codes and help text ride along on the type via `miette`.
//! Per-target failures (compile/archive/link) are non-fatal: they stop
//! scheduling after their region, accumulate, and are rendered by
//! [`TargetFailure::report`] in the end-of-build summary.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str = "help: create a fathom.toml in the project root";

    /// Suggestion when a used module has no provider.
    pub const MISSING_MODULE: &str =
        "help: declare system-provided modules under [build] external-modules";

    /// Suggestion when a build fails.
    pub const BUILD_FAILED: &str = "help: run `fathom build --verbose` for full compiler output";

    /// Suggestion when an executable target is not found.
    pub const TARGET_NOT_FOUND: &str =
        "help: declare the program in [[executable]] or enable auto-executables";
}

/// Fatal build errors.
///
/// Everything here aborts the build immediately; see [`TargetFailure`] for the
/// accumulating per-target kind.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    /// A referenced file or directory does not exist.
    #[error("file not found: {}", .path.display())]
    #[diagnostic(code(fathom::io::not_found))]
    FileNotFound { path: PathBuf },

    /// A source file could not be parsed.
    #[error("{}:{line}:{column}: {message}", .file.display())]
    #[diagnostic(code(fathom::parse::malformed))]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// An invalid manifest declaration.
    #[error("invalid manifest for `{package}`: {message}")]
    #[diagnostic(code(fathom::manifest::invalid))]
    Manifest { package: String, message: String },

    /// A cycle in the module, target, or package graph.
    #[error("dependency cycle involving: {}", .names.join(" -> "))]
    #[diagnostic(
        code(fathom::graph::cycle),
        help("break the cycle by moving one of the participants into its own module")
    )]
    Cycle { names: Vec<String> },

    /// A used module with no provider in the model.
    #[error("module `{module}` used by {} is not provided by any source", .consumer.display())]
    #[diagnostic(
        code(fathom::graph::missing_module),
        help("declare system-provided modules under [build] external-modules")
    )]
    MissingModule { module: String, consumer: PathBuf },
}

/// The phase in which a target failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    Compile,
    Archive,
    Link,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePhase::Compile => write!(f, "compilation"),
            FailurePhase::Archive => write!(f, "archiving"),
            FailurePhase::Link => write!(f, "linking"),
        }
    }
}

/// A non-fatal, per-target failure collected during execution.
#[derive(Debug, Clone)]
pub struct TargetFailure {
    /// Output file of the failing target.
    pub output_file: PathBuf,
    /// Which phase failed.
    pub phase: FailurePhase,
    /// Exit code of the external tool (-1 when killed by a signal, or when
    /// the log/digest could not be written).
    pub exit_code: i32,
    /// Path to the captured log, when one was written.
    pub log_file: Option<PathBuf>,
}

impl TargetFailure {
    /// Render the failure for the end-of-build summary: the one-line cause,
    /// where the full tool output went, and the standard hint.
    pub fn report(&self) -> String {
        let mut out = format!("error: {self}\n");
        if let Some(log) = &self.log_file {
            out.push_str(&format!("  --> {}\n", log.display()));
        }
        out.push_str(&format!("  {}\n", suggestions::BUILD_FAILED));
        out
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {} (exit code {})",
            self.phase,
            self.output_file.display(),
            self.exit_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display() {
        let err = BuildError::Cycle {
            names: vec!["a.o".to_string(), "b.o".to_string(), "a.o".to_string()],
        };
        assert_eq!(err.to_string(), "dependency cycle involving: a.o -> b.o -> a.o");
    }

    #[test]
    fn test_parse_error_display() {
        let err = BuildError::Parse {
            file: PathBuf::from("src/bad.f90"),
            line: 12,
            column: 3,
            message: "submodule is missing its parent list".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("src/bad.f90:12:3:"));
        assert!(text.contains("parent list"));
    }

    #[test]
    fn test_target_failure_display() {
        let failure = TargetFailure {
            output_file: PathBuf::from("build/debug/app/main.o"),
            phase: FailurePhase::Compile,
            exit_code: 1,
            log_file: None,
        };
        let text = failure.to_string();
        assert!(text.contains("compilation failed"));
        assert!(text.contains("main.o"));
    }

    #[test]
    fn test_failure_report_includes_log_and_hint() {
        let failure = TargetFailure {
            output_file: PathBuf::from("build/debug/app/main.o"),
            phase: FailurePhase::Link,
            exit_code: 2,
            log_file: Some(PathBuf::from("build/debug/app/main.o.log")),
        };

        let report = failure.report();
        assert!(report.starts_with("error: linking failed"));
        assert!(report.contains("--> build/debug/app/main.o.log"));
        assert!(report.contains(suggestions::BUILD_FAILED));
    }

    #[test]
    fn test_failure_report_without_log() {
        let failure = TargetFailure {
            output_file: PathBuf::from("build/debug/pkg/m.o"),
            phase: FailurePhase::Compile,
            exit_code: -1,
            log_file: None,
        };

        let report = failure.report();
        assert!(!report.contains("-->"));
        assert!(report.contains("exit code -1"));
    }
}
