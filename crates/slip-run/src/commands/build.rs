use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use slip_ensemble::{load_table, EnsembleBuilder, EnsembleManifest, DEFAULT_TABLE};
use tracing::info;

use super::{ExecArgs, OutputArgs};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Parameter table, one row of subfault slips per run.
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: PathBuf,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Worker threads preparing runs (overrides the configuration).
    #[arg(long)]
    pub parallelism: Option<usize>,
    #[command(flatten)]
    pub exec: ExecArgs,
}

pub fn run(args: &BuildArgs) -> Result<(), Box<dyn Error>> {
    let mut config = args.output.load_config()?;
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    let base = args.output.base_dir()?;

    let table = load_table(&args.table)?;
    info!(runs = table.len(), dim = table.dim(), path = %args.table.display(), "table loaded");

    let ensemble = EnsembleBuilder::from_config(&config, &base).build(&table)?;
    let manifest =
        EnsembleManifest::from_ensemble(&config.name, &config.executable, &ensemble, &args.table)?;
    let manifest_path = config.manifest_path(&base);
    manifest.write(&manifest_path)?;
    info!(path = %manifest_path.display(), "manifest written");

    print!("{}", ensemble.report());
    args.exec.submit(&config, ensemble.runs)
}
