pub mod build;
pub mod inspect;
pub mod replay;
pub mod sample;

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use slip_batch::{DryRunExecutor, ExecutionHandoff, LocalExecutor, SubmitOptions};
use slip_ensemble::{EnsembleConfig, EnsembleError, RunDescriptor};

/// Where the ensemble lives and how it is configured.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Base output directory; the ensemble root is `<out>/<layout.subdir>`.
    #[arg(long, env = "DATA_PATH")]
    pub out: Option<PathBuf>,
    /// YAML ensemble configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl OutputArgs {
    pub fn load_config(&self) -> Result<EnsembleConfig, EnsembleError> {
        match &self.config {
            Some(path) => EnsembleConfig::load(path),
            None => Ok(EnsembleConfig::default()),
        }
    }

    /// Base output directory, the current directory when unset.
    pub fn base_dir(&self) -> Result<PathBuf, Box<dyn Error>> {
        match &self.out {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Execution toggles shared by `build` and `replay`.
#[derive(Args, Debug, Clone, Default)]
pub struct ExecArgs {
    /// Run the configured executable for every prepared run.
    #[arg(long)]
    pub execute: bool,
    /// Block until every submitted run has finished.
    #[arg(long)]
    pub wait: bool,
    /// Let the executor render an aggregate outcome plot.
    #[arg(long)]
    pub plot: bool,
    /// Attempts per run before it is reported failed.
    #[arg(long, default_value_t = 1)]
    pub max_retries: u32,
}

impl ExecArgs {
    fn options(&self) -> SubmitOptions {
        SubmitOptions {
            block_until_complete: self.wait,
            auto_plot: self.plot,
        }
    }

    /// Hands prepared runs to the local executor, or logs them when not executing.
    pub fn submit(
        &self,
        config: &EnsembleConfig,
        runs: Vec<RunDescriptor>,
    ) -> Result<(), Box<dyn Error>> {
        if !self.execute {
            let controller = ExecutionHandoff::from_config(DryRunExecutor, config)
                .submit(runs, self.options())?;
            println!("{controller}");
            return Ok(());
        }

        let executor = LocalExecutor {
            parallelism: config.parallelism,
            max_retries: self.max_retries,
            plot_dir: None,
            figure: config.figure,
        };
        let mut controller =
            ExecutionHandoff::from_config(executor, config).submit(runs, self.options())?;
        println!("{controller}");
        if !self.wait {
            // local jobs die with the process
            let summary = controller.wait()?;
            println!("{summary}");
        }
        Ok(())
    }
}
