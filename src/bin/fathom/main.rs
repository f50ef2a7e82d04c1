//! The fathom CLI entry point.

mod cli;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use fathom::core::manifest::MANIFEST_NAME;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    let verbose = cli.verbose;
    let manifest = find_manifest()?;

    match cli.command {
        Commands::Build(args) => commands::build::execute(&manifest, args, verbose),
        Commands::Run(args) => commands::run::execute(&manifest, args, verbose),
        Commands::Test(args) => commands::test::execute(&manifest, args, verbose),
        Commands::Clean => commands::clean::execute(&manifest),
    }
}

/// Walk up from the working directory to the nearest manifest.
fn find_manifest() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let mut dir = cwd.as_path();

    loop {
        let candidate = dir.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => bail!(
                "no {MANIFEST_NAME} found in {} or any parent directory",
                cwd.display()
            ),
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_env("FATHOM_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
