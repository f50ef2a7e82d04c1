//! `fathom clean` command

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use fathom::ops::clean::clean;

pub fn execute(manifest: &Path) -> Result<ExitCode> {
    clean(manifest)?;
    Ok(ExitCode::SUCCESS)
}
