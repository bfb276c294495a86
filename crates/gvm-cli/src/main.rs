//! gvm-cli - a command-line driver for the graph VM.
//!
//! Assembles `.gvasm` source with `gvm-asm` and either runs it through
//! `gvm-runtime` to completion, or just checks that it assembles.

mod commands;
mod config;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    asm::{run_asm, AsmArgs},
    run::{run_run, RunArgs},
};
use config::Config;
use error::{CliError, Result};

/// gvm-cli - assemble and run graph-VM programs.
#[derive(Parser, Debug)]
#[command(name = "gvm-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assemble and run graph-VM programs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true, env = "GVM_VERBOSE")]
    verbose: bool,

    /// Path to a TOML config file (defaults to `./gvm.toml` if present).
    #[arg(short, long, global = true, env = "GVM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble and run a `.gvasm` file.
    Run(RunCommand),

    /// Assemble a `.gvasm` file without running it.
    Asm(AsmCommand),
}

#[derive(Parser, Debug)]
struct RunCommand {
    /// Path to the `.gvasm` source file.
    file: PathBuf,

    /// Run at most this many ticks (overrides the config file's
    /// `max_ticks_per_run`).
    #[arg(long)]
    steps: Option<usize>,
}

#[derive(Parser, Debug)]
struct AsmCommand {
    /// Path to the `.gvasm` source file.
    file: PathBuf,

    /// Print a debug dump of the program's head instruction.
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = Config::load(cli.config.as_deref())?;

    execute_command(cli.command, config)
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")) };

    let subscriber = fmt::layer().with_target(false).with_thread_ids(false).with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| CliError::Config(format!("failed to initialize logging: {e}")))?;

    Ok(())
}

fn execute_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run(args) => run_run(RunArgs { file: args.file, steps: args.steps }, config),
        Commands::Asm(args) => run_asm(AsmArgs { file: args.file, dump: args.dump }),
    }
}
