//! `fathom build` command

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use fathom::ops::build::build;

use crate::cli::BuildArgs;
use crate::commands::build_options;

pub fn execute(manifest: &Path, args: BuildArgs, verbose: bool) -> Result<ExitCode> {
    let opts = build_options(&args, verbose);
    let outcome = build(manifest, &opts)?;

    if outcome.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
