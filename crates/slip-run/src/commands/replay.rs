use std::error::Error;

use clap::Args;
use slip_ensemble::{EnsembleBuilder, RunNumber};

use super::{ExecArgs, OutputArgs};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub output: OutputArgs,
    /// Runs to re-prepare; every logged run when omitted.
    #[arg(long = "run", value_name = "N", value_delimiter = ',')]
    pub runs: Vec<u64>,
    /// Worker threads preparing runs (overrides the configuration).
    #[arg(long)]
    pub parallelism: Option<usize>,
    #[command(flatten)]
    pub exec: ExecArgs,
}

pub fn run(args: &ReplayArgs) -> Result<(), Box<dyn Error>> {
    let mut config = args.output.load_config()?;
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    let base = args.output.base_dir()?;
    let selection: Vec<RunNumber> = args.runs.iter().copied().map(RunNumber::from_raw).collect();

    let builder = EnsembleBuilder::from_config(&config, &base);
    let ensemble = if selection.is_empty() {
        builder.replay(None)?
    } else {
        builder.replay(Some(selection.as_slice()))?
    };
    print!("{}", ensemble.report());
    args.exec.submit(&config, ensemble.runs)
}
