//! `fathom run` command

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use fathom::ops::run::{run, RunOptions, RunScope};

use crate::cli::RunArgs;
use crate::commands::build_options;

pub fn execute(manifest: &Path, args: RunArgs, verbose: bool) -> Result<ExitCode> {
    let opts = RunOptions {
        build: build_options(&args.build, verbose),
        target: args.target,
        args: args.args,
        scope: if args.example {
            RunScope::Example
        } else {
            RunScope::App
        },
    };

    let code = run(manifest, &opts)?;
    if code == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(code.clamp(1, 255) as u8))
    }
}
