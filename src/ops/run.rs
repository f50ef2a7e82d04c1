//! Running built executables: `fathom run` and `fathom test`.

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::target::TargetKind;
use crate::ops::build::{build, Artifact, BuildOptions};
use crate::util::diagnostic::suggestions;
use crate::util::process::ProcessBuilder;

/// Which executable scope to run from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    App,
    Example,
    Test,
}

impl RunScope {
    fn dir_name(&self) -> &'static str {
        match self {
            RunScope::App => "app",
            RunScope::Example => "example",
            RunScope::Test => "test",
        }
    }
}

/// Options for running.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Underlying build options.
    pub build: BuildOptions,
    /// Executable name; required when more than one exists.
    pub target: Option<String>,
    /// Arguments forwarded to the executable.
    pub args: Vec<String>,
    /// Scope to select from.
    pub scope: RunScope,
}

/// Build, then run the selected executable (or, for the test scope with no
/// name, every test). Returns the first non-zero child exit code, or 0.
pub fn run(manifest_path: &Path, opts: &RunOptions) -> Result<i32> {
    let mut build_opts = opts.build.clone();
    build_opts.include_tests |= opts.scope == RunScope::Test;

    let outcome = build(manifest_path, &build_opts)?;
    if !outcome.success {
        bail!("build failed; not running");
    }

    let scope_dir = outcome.build_prefix.join(opts.scope.dir_name());
    let mut candidates: Vec<&Artifact> = outcome
        .artifacts
        .iter()
        .filter(|a| a.kind == TargetKind::Executable && a.path.starts_with(&scope_dir))
        .collect();
    candidates.sort_by(|a, b| a.path.cmp(&b.path));

    if let Some(name) = &opts.target {
        candidates.retain(|a| {
            a.path
                .file_stem()
                .map(|s| s.to_string_lossy() == name.as_str())
                .unwrap_or(false)
        });
    }

    if candidates.is_empty() {
        bail!(
            "no matching {} executable found\n{}",
            opts.scope.dir_name(),
            suggestions::TARGET_NOT_FOUND
        );
    }

    // Running multiple executables is only meaningful for tests.
    if candidates.len() > 1 && opts.scope != RunScope::Test {
        let names: Vec<String> = candidates
            .iter()
            .filter_map(|a| a.path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        bail!(
            "multiple executables available: {}; select one with --target",
            names.join(", ")
        );
    }

    let mut first_failure = 0;
    for artifact in candidates {
        tracing::info!("running {}", artifact.path.display());
        let status = ProcessBuilder::new(&artifact.path)
            .args(&opts.args)
            .status()?;
        let code = status.code().unwrap_or(-1);
        if code != 0 {
            eprintln!(
                "error: {} exited with code {}",
                artifact.path.display(),
                code
            );
            if first_failure == 0 {
                first_failure = code;
            }
        }
    }

    Ok(first_failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_dirs() {
        assert_eq!(RunScope::App.dir_name(), "app");
        assert_eq!(RunScope::Example.dir_name(), "example");
        assert_eq!(RunScope::Test.dir_name(), "test");
    }
}
