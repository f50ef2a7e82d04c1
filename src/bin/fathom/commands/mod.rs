//! Command implementations.

pub mod build;
pub mod clean;
pub mod run;

use fathom::core::model::Profile;
use fathom::ops::build::BuildOptions;

use crate::cli::BuildArgs;

/// Translate CLI build flags into library build options.
pub fn build_options(args: &BuildArgs, verbose: bool) -> BuildOptions {
    BuildOptions {
        profile: if args.debug {
            Profile::Debug
        } else {
            Profile::Release
        },
        jobs: args.jobs,
        dry_run: args.dry_run,
        include_tests: args.tests,
        verbose,
        fortran_flags: args.flags.clone(),
        link_flags: args.link_flags.clone(),
        emit_compile_commands: !args.no_compile_commands,
    }
}
