use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use slip_ensemble::surface::moment_magnitude;
use slip_ensemble::{read_run_log, EnsembleStatistics};

use super::OutputArgs;

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub output: OutputArgs,
    /// Run log to read; defaults to the configured location.
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let config = args.output.load_config()?;
    let path = match &args.log {
        Some(path) => path.clone(),
        None => config.run_log_path(&args.output.base_dir()?),
    };
    let entries = read_run_log(&path)?;
    let statistics = EnsembleStatistics::compute(entries.iter().map(|entry| &entry.parameters));
    let magnitudes: Vec<Option<f64>> = entries
        .iter()
        .map(|entry| moment_magnitude(config.fault.seismic_moment(&entry.parameters)))
        .collect();

    if args.json {
        let runs: Vec<_> = entries
            .iter()
            .zip(&magnitudes)
            .map(|(entry, mw)| {
                json!({
                    "run_number": entry.run_number,
                    "prefix": entry.run_number.prefix(),
                    "parameters": entry.parameters,
                    "mw": mw,
                })
            })
            .collect();
        let body = json!({
            "run_log": path.display().to_string(),
            "runs": runs,
            "statistics": statistics,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}: {} runs", path.display(), entries.len());
    for (dim, range) in statistics.dimensions.iter().enumerate() {
        match range {
            Some(range) => println!("  p{dim}: {:.3} .. {:.3}", range.min, range.max),
            None => println!("  p{dim}: no finite values"),
        }
    }
    for (entry, mw) in entries.iter().zip(&magnitudes) {
        let mw = mw.map_or_else(|| "n/a".to_string(), |mw| format!("{mw:.2}"));
        println!(
            "  {:<10} Mw {:>5}  {}",
            entry.run_number.prefix(),
            mw,
            entry.parameters.to_log_fields()
        );
    }
    Ok(())
}
