//! The top-level build operation.
//!
//! Ties the pipeline together: assemble packages, construct the model and
//! target graph, schedule, execute, and emit `compile_commands.json`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Result};

use crate::builder::assemble::assemble_packages;
use crate::builder::executor::{self, BuildSession, ExecutorOptions};
use crate::builder::progress::{Console, ConsoleMode};
use crate::builder::schedule;
use crate::builder::targets::build_target_graph;
use crate::builder::toolchain::{Archiver, Compiler};
use crate::core::model::{BuildModel, Profile};
use crate::core::target::TargetKind;
use crate::util::diagnostic::TargetFailure;
use crate::util::process::{
    find_ar, find_c_compiler, find_cxx_compiler, find_fortran_compiler,
};

/// Options for a build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Build profile.
    pub profile: Profile,
    /// Worker cap.
    pub jobs: Option<usize>,
    /// Record commands without running tools.
    pub dry_run: bool,
    /// Build test-scope sources.
    pub include_tests: bool,
    /// Line-per-event output.
    pub verbose: bool,
    /// Extra Fortran flags appended after the profile defaults.
    pub fortran_flags: Vec<String>,
    /// Extra link flags.
    pub link_flags: Vec<String>,
    /// Emit compile_commands.json (default on).
    pub emit_compile_commands: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            profile: Profile::Release,
            jobs: None,
            dry_run: false,
            include_tests: false,
            verbose: false,
            fortran_flags: Vec::new(),
            link_flags: Vec::new(),
            emit_compile_commands: true,
        }
    }
}

/// A built (or already fresh) artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Output path.
    pub path: PathBuf,
    /// Artifact kind.
    pub kind: TargetKind,
    /// Owning package.
    pub package: String,
}

/// The outcome of a build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Whether the build fully succeeded.
    pub success: bool,
    /// Targets executed.
    pub executed: usize,
    /// Targets skipped as fresh.
    pub skipped: usize,
    /// Per-target failures, first failure first.
    pub failures: Vec<TargetFailure>,
    /// Linkable/runnable artifacts (archives, shared libraries,
    /// executables), fresh or rebuilt.
    pub artifacts: Vec<Artifact>,
    /// The build prefix used.
    pub build_prefix: PathBuf,
}

/// Run a build for the project whose manifest is at `manifest_path`.
pub fn build(manifest_path: &Path, opts: &BuildOptions) -> Result<BuildOutcome> {
    let start = Instant::now();

    let packages = assemble_packages(manifest_path, opts.include_tests)?;
    let model = build_model(manifest_path, packages, opts)?;

    let mut graph = build_target_graph(&model)?;
    let queue = schedule::schedule(&mut graph)?;

    tracing::info!(
        "{} target(s): {} to build, {} fresh",
        graph.len(),
        queue.len(),
        queue.skipped
    );

    let console = if opts.dry_run {
        Console::silent()
    } else {
        Console::new(ConsoleMode::auto(opts.verbose), queue.len())
    };
    let session = BuildSession::new(console);

    let exec_opts = ExecutorOptions {
        jobs: opts.jobs,
        dry_run: opts.dry_run,
    };
    let report = executor::execute(&model, &graph, &queue, &session, &exec_opts)?;

    if opts.emit_compile_commands {
        if let Some(path) = session.commands.write(&model.build_prefix)? {
            tracing::debug!("wrote {}", path.display());
        }
    }

    for failure in &report.failures {
        eprint!("{}", failure.report());
    }

    let artifacts = graph
        .ids()
        .map(|id| graph.target(id))
        .filter(|t| !t.kind.is_object())
        .map(|t| Artifact {
            path: t.output_file.clone(),
            kind: t.kind,
            package: t.package.clone(),
        })
        .collect();

    if report.success && !opts.dry_run {
        eprintln!(
            "    Finished {} profile in {:.2}s ({} compiled, {} fresh)",
            model.profile.as_str(),
            start.elapsed().as_secs_f64(),
            report.executed,
            report.skipped
        );
    }

    Ok(BuildOutcome {
        success: report.success,
        executed: report.executed,
        skipped: report.skipped,
        failures: report.failures,
        artifacts,
        build_prefix: model.build_prefix,
    })
}

/// Construct the closed world for the target builder.
fn build_model(
    manifest_path: &Path,
    packages: Vec<crate::core::package::Package>,
    opts: &BuildOptions,
) -> Result<BuildModel> {
    let fc = find_fortran_compiler().ok_or_else(|| {
        anyhow!(
            "no Fortran compiler found\n\
             \n\
             fathom requires a Fortran compiler (gfortran, ifx, ifort, ...).\n\
             Set the FC environment variable or install a compiler."
        )
    })?;
    // A missing C compiler is tolerable for pure-Fortran projects; the
    // Fortran driver fills in.
    let cc = find_c_compiler().unwrap_or_else(|| fc.clone());
    let cxx = find_cxx_compiler().unwrap_or_else(|| cc.clone());
    let ar = find_ar().ok_or_else(|| {
        anyhow!(
            "no archiver found\n\
             \n\
             fathom requires an archiver (ar or lib).\n\
             Set the AR environment variable or install binutils."
        )
    })?;

    let compiler = Compiler::new(fc, cc, cxx);
    let archiver = Archiver::new(ar);

    let mut fortran_flags = compiler.flag_set().default_flags(opts.profile);
    fortran_flags.extend(opts.fortran_flags.iter().cloned());

    let (c_flags, cxx_flags) = match opts.profile {
        Profile::Release => (vec!["-O2".to_string()], vec!["-O2".to_string()]),
        Profile::Debug => (
            vec!["-O0".to_string(), "-g".to_string()],
            vec!["-O0".to_string(), "-g".to_string()],
        ),
    };

    let external_modules: BTreeSet<String> = packages
        .iter()
        .flat_map(|p| p.manifest.build.external_modules.iter())
        .map(|m| m.to_lowercase())
        .collect();

    let project_root = manifest_path.parent().unwrap_or(Path::new("."));
    let build_prefix = project_root.join("build").join(opts.profile.as_str());

    Ok(BuildModel {
        root_package_name: packages[0].name.clone(),
        packages,
        compiler,
        archiver,
        profile: opts.profile,
        fortran_flags,
        c_flags,
        cxx_flags,
        link_flags: opts.link_flags.clone(),
        build_prefix,
        include_dirs: Vec::new(),
        link_libraries: Vec::new(),
        external_modules,
        include_tests: opts.include_tests,
    })
}
