//! Build execution.
//!
//! Walks the schedule queue region by region. Targets within a region run on
//! a parallel worker pool; a region boundary is a barrier. The first failing
//! region stops scheduling of later regions, but in-flight compilations are
//! never killed.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use rayon::prelude::*;

use crate::builder::commands::CommandTable;
use crate::builder::fingerprint;
use crate::builder::progress::Console;
use crate::builder::schedule::BuildQueue;
use crate::builder::toolchain::response_file_needed;
use crate::core::model::BuildModel;
use crate::core::target::{Target, TargetGraph, TargetId, TargetKind};
use crate::util::diagnostic::{FailurePhase, TargetFailure};
use crate::util::fs::ensure_dir;
use crate::util::process::ProcessBuilder;

/// Process-wide collaborators, scoped to one build invocation.
#[derive(Debug)]
pub struct BuildSession {
    /// The progress console.
    pub console: Console,
    /// The compile command record table.
    pub commands: CommandTable,
}

impl BuildSession {
    /// Create a session.
    pub fn new(console: Console) -> Self {
        BuildSession {
            console,
            commands: CommandTable::new(),
        }
    }
}

/// Executor configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorOptions {
    /// Worker cap; defaults to available parallelism.
    pub jobs: Option<usize>,
    /// Record commands without running anything.
    pub dry_run: bool,
}

/// Outcome of one execution.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Whether every scheduled target succeeded.
    pub success: bool,
    /// Targets actually executed.
    pub executed: usize,
    /// Targets skipped as up to date.
    pub skipped: usize,
    /// Collected per-target failures.
    pub failures: Vec<TargetFailure>,
}

/// Execute the queue against the graph.
pub fn execute(
    model: &BuildModel,
    graph: &TargetGraph,
    queue: &BuildQueue,
    session: &BuildSession,
    opts: &ExecutorOptions,
) -> Result<BuildReport> {
    let mut report = BuildReport {
        success: true,
        executed: 0,
        skipped: queue.skipped,
        failures: Vec::new(),
    };

    if opts.dry_run {
        for &id in &queue.order {
            record_command(model, graph, graph.target(id), session);
            report.executed += 1;
        }
        return Ok(report);
    }

    let pool = build_pool(opts.jobs)?;
    let position = AtomicUsize::new(1);

    for region in queue.regions() {
        let failures: Vec<TargetFailure> = pool.install(|| {
            region
                .par_iter()
                .filter_map(|&id| {
                    let position = position.fetch_add(1, Ordering::SeqCst);
                    build_target(model, graph, id, position, session).err()
                })
                .collect()
        });

        report.executed += region.len();

        if !failures.is_empty() {
            tracing::debug!(
                "{} failure(s) in region; not scheduling further regions",
                failures.len()
            );
            report.failures.extend(failures);
            report.success = false;
            break;
        }
    }

    session.console.finish();
    Ok(report)
}

fn build_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        builder = builder.num_threads(jobs.max(1));
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create worker pool: {e}"))
}

/// Build one target. Errors are per-target failures, never fatal.
fn build_target(
    model: &BuildModel,
    graph: &TargetGraph,
    id: TargetId,
    position: usize,
    session: &BuildSession,
) -> std::result::Result<(), TargetFailure> {
    let target = graph.target(id);
    let line = session.console.start_target(&target.label(), position);

    let phase = phase_of(target.kind);
    let io_failure = |target: &Target| TargetFailure {
        output_file: target.output_file.clone(),
        phase,
        exit_code: -1,
        log_file: None,
    };

    if let Some(parent) = target.output_file.parent() {
        if ensure_dir(parent).is_err() {
            line.failed(&session.console, -1);
            return Err(io_failure(target));
        }
    }

    let log = target.log_file();
    let result = match target.kind {
        TargetKind::FortranObject | TargetKind::CObject | TargetKind::CppObject => {
            let Some(source) = graph.source_of(id) else {
                line.failed(&session.console, -1);
                return Err(io_failure(target));
            };
            let flags = object_flags(target);
            match target.kind {
                TargetKind::FortranObject => {
                    model
                        .compiler
                        .compile_fortran(&source.path, &target.output_file, &flags, &log)
                }
                TargetKind::CObject => {
                    model
                        .compiler
                        .compile_c(&source.path, &target.output_file, &flags, &log)
                }
                _ => model
                    .compiler
                    .compile_cpp(&source.path, &target.output_file, &flags, &log),
            }
        }
        TargetKind::Archive => {
            let use_response_file = response_file_needed(&target.link_objects);
            model.archiver.archive(
                &target.link_objects,
                &target.output_file,
                use_response_file,
                &log,
            )
        }
        TargetKind::Executable => model.compiler.link_executable(
            &target.link_objects,
            &target.output_file,
            &target.link_flags,
            &log,
        ),
        TargetKind::SharedLib => model.compiler.link_shared(
            &target.link_objects,
            &target.output_file,
            &target.link_flags,
            &log,
        ),
    };

    let (exit_code, output) = match result {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!("failed to invoke tool for {}: {e}", target.output_file.display());
            line.failed(&session.console, -1);
            return Err(io_failure(target));
        }
    };

    if exit_code != 0 {
        line.failed(&session.console, exit_code);
        if !output.trim().is_empty() {
            session.console.message(output.trim_end());
        }
        return Err(TargetFailure {
            output_file: target.output_file.clone(),
            phase,
            exit_code,
            log_file: Some(log),
        });
    }

    if fingerprint::write_digest(&target.output_file, target.digest_expected).is_err() {
        line.failed(&session.console, -1);
        return Err(io_failure(target));
    }

    record_command(model, graph, target, session);
    line.done(&session.console);
    Ok(())
}

fn phase_of(kind: TargetKind) -> FailurePhase {
    match kind {
        TargetKind::Archive => FailurePhase::Archive,
        TargetKind::Executable | TargetKind::SharedLib => FailurePhase::Link,
        _ => FailurePhase::Compile,
    }
}

/// The full compile flag list, in composition order.
fn object_flags(target: &Target) -> Vec<String> {
    let mut flags = target.compile_flags.clone();
    flags.extend(target.preprocess_defs.iter().cloned());
    flags.extend(target.include_flags.iter().cloned());
    flags
}

/// Register a compile command for object targets.
fn record_command(model: &BuildModel, graph: &TargetGraph, target: &Target, session: &BuildSession) {
    if !target.kind.is_object() {
        return;
    }
    let Some(source) = target.source.map(|sid| graph.source(sid)) else {
        return;
    };

    let flags = object_flags(target);
    let cmd: ProcessBuilder = match target.kind {
        TargetKind::FortranObject => {
            model
                .compiler
                .compile_fortran_command(&source.path, &target.output_file, &flags)
        }
        TargetKind::CObject => {
            model
                .compiler
                .compile_c_command(&source.path, &target.output_file, &flags)
        }
        _ => model
            .compiler
            .compile_cpp_command(&source.path, &target.output_file, &flags),
    };

    session
        .commands
        .register(&model.build_prefix, &source.path, cmd.tokens());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::progress::Console;
    use crate::builder::schedule;
    use crate::builder::toolchain::{Archiver, Compiler, CompilerVendor};
    use crate::core::model::Profile;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn empty_model(build_prefix: PathBuf) -> BuildModel {
        BuildModel {
            root_package_name: "p".to_string(),
            packages: Vec::new(),
            compiler: Compiler::with_vendor(
                PathBuf::from("gfortran"),
                PathBuf::from("gcc"),
                PathBuf::from("g++"),
                CompilerVendor::Gcc,
            ),
            archiver: Archiver::new(PathBuf::from("ar")),
            profile: Profile::Debug,
            fortran_flags: Vec::new(),
            c_flags: Vec::new(),
            cxx_flags: Vec::new(),
            link_flags: Vec::new(),
            build_prefix,
            include_dirs: Vec::new(),
            link_libraries: Vec::new(),
            external_modules: BTreeSet::new(),
            include_tests: true,
        }
    }

    #[test]
    fn test_dry_run_records_without_executing() {
        use crate::core::source::SourceFile;
        use crate::core::target::Target;

        let tmp = tempfile::TempDir::new().unwrap();
        let model = empty_model(tmp.path().to_path_buf());

        let mut graph = TargetGraph::default();
        let sid = graph.push_source(SourceFile {
            path: tmp.path().join("m.f90"),
            ..Default::default()
        });
        let mut target = Target::new(
            TargetKind::FortranObject,
            tmp.path().join("out/m.o"),
            "p",
        );
        target.source = Some(sid);
        graph.push_target(target);

        let queue = schedule::schedule(&mut graph).unwrap();
        let session = BuildSession::new(Console::silent());
        let opts = ExecutorOptions {
            jobs: Some(1),
            dry_run: true,
        };

        let report = execute(&model, &graph, &queue, &session, &opts).unwrap();
        assert!(report.success);
        assert_eq!(report.executed, 1);
        assert_eq!(session.commands.len(), 1);
        // Nothing touched the filesystem.
        assert!(!tmp.path().join("out/m.o").exists());
        assert!(!tmp.path().join("out/m.o.digest").exists());
    }

    #[test]
    fn test_empty_queue_succeeds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let model = empty_model(tmp.path().to_path_buf());
        let graph = TargetGraph::default();
        let queue = BuildQueue::default();
        let session = BuildSession::new(Console::silent());

        let report = execute(
            &model,
            &graph,
            &queue,
            &session,
            &ExecutorOptions::default(),
        )
        .unwrap();
        assert!(report.success);
        assert_eq!(report.executed, 0);
        assert!(session.commands.is_empty());
    }
}
