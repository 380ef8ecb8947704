use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use slip_ensemble::{latin_hypercube, write_table, SampleSpec, ValueRange, DEFAULT_TABLE};

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Number of runs to draw.
    #[arg(long)]
    pub runs: usize,
    /// Subfaults (parameters) per run.
    #[arg(long, default_value_t = 1)]
    pub dims: usize,
    /// Smallest slip in metres.
    #[arg(long, default_value_t = SampleSpec::DEFAULT_RANGE.min)]
    pub min: f64,
    /// Largest slip in metres.
    #[arg(long, default_value_t = SampleSpec::DEFAULT_RANGE.max)]
    pub max: f64,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Destination table.
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub out: PathBuf,
}

pub fn run(args: &SampleArgs) -> Result<(), Box<dyn Error>> {
    let spec = SampleSpec {
        runs: args.runs,
        ranges: vec![
            ValueRange {
                min: args.min,
                max: args.max,
            };
            args.dims
        ],
        seed: args.seed,
    };
    let table = latin_hypercube(&spec)?;
    write_table(&args.out, &table)?;
    println!(
        "wrote {} runs x {} parameters to {}",
        table.len(),
        table.dim(),
        args.out.display()
    );
    Ok(())
}
