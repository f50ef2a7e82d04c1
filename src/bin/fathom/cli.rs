//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};

/// Fathom - a Cargo-like package manager and build driver for Fortran
#[derive(Parser)]
#[command(name = "fathom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (one line per event, full logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the current package
    Build(BuildArgs),

    /// Build and run an executable
    Run(RunArgs),

    /// Build and run tests
    Test(TestArgs),

    /// Remove build artifacts
    Clean,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build with the release profile (default)
    #[arg(long, conflicts_with = "debug")]
    pub release: bool,

    /// Build with the debug profile
    #[arg(long)]
    pub debug: bool,

    /// Number of parallel compile jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Plan and record commands without invoking any tool
    #[arg(long)]
    pub dry_run: bool,

    /// Also build test executables
    #[arg(long)]
    pub tests: bool,

    /// Extra Fortran compiler flags (may be repeated)
    #[arg(long = "flag", value_name = "FLAG")]
    pub flags: Vec<String>,

    /// Extra linker flags (may be repeated)
    #[arg(long = "link-flag", value_name = "FLAG")]
    pub link_flags: Vec<String>,

    /// Do not write compile_commands.json
    #[arg(long)]
    pub no_compile_commands: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Executable name (required when more than one exists)
    pub target: Option<String>,

    /// Run an example instead of an app executable
    #[arg(long)]
    pub example: bool,

    #[command(flatten)]
    pub build: BuildArgs,

    /// Arguments passed to the executable
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Test name filter
    pub target: Option<String>,

    #[command(flatten)]
    pub build: BuildArgs,

    /// Arguments passed to the test executables
    #[arg(last = true)]
    pub args: Vec<String>,
}
