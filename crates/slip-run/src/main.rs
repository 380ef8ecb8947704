use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    build::{self, BuildArgs},
    inspect::{self, InspectArgs},
    replay::{self, ReplayArgs},
    sample::{self, SampleArgs},
};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "slip-run", about = "Fault-slip ensemble generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an ensemble from a parameter table and optionally run it.
    Build(BuildArgs),
    /// Draw a Latin hypercube parameter table.
    Sample(SampleArgs),
    /// Re-prepare runs recorded in an existing run log.
    Replay(ReplayArgs),
    /// Summarize a run log.
    Inspect(InspectArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => build::run(&args),
        Command::Sample(args) => sample::run(&args),
        Command::Replay(args) => replay::run(&args),
        Command::Inspect(args) => inspect::run(&args),
    }
}
