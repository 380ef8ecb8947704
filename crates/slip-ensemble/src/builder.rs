use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::RunNumber;
use tracing::{info, warn};

use crate::config::EnsembleConfig;
use crate::descriptor::{ArtifactContext, OverwritePolicy, RunDescriptor, RunUnit};
use crate::figures::{DiagnosticRenderer, SlipPlotRenderer};
use crate::runlog::{read_run_log, RunLog};
use crate::stats::EnsembleStatistics;
use crate::surface::{SubfaultSurface, SurfaceGenerator};
use crate::table::ParameterTable;

/// A run whose preparation failed, with its cause.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    /// Run that failed.
    pub run_number: RunNumber,
    /// Preparation error, run number attached.
    pub error: EnsembleError,
}

/// Outcome of an ensemble build.
#[derive(Debug, Clone)]
pub struct Ensemble {
    /// Statistics over every run of the table, shared by all descriptors.
    pub statistics: Arc<EnsembleStatistics>,
    /// Successfully prepared runs in run-number order.
    pub runs: Vec<RunDescriptor>,
    /// Runs that failed preparation, in run-number order.
    pub failures: Vec<RunFailure>,
    /// Run log backing this ensemble.
    pub run_log: PathBuf,
    /// Number of runs described by the table (before filtering).
    pub total_runs: usize,
}

impl Ensemble {
    /// Run numbers of the failed runs, ascending.
    pub fn failed_run_numbers(&self) -> Vec<RunNumber> {
        self.failures.iter().map(|failure| failure.run_number).collect()
    }

    /// Summary suitable for printing.
    pub fn report(&self) -> BuildReport {
        BuildReport {
            total_runs: self.total_runs,
            prepared: self.runs.len(),
            failures: self
                .failures
                .iter()
                .map(|failure| (failure.run_number, failure.error.to_string()))
                .collect(),
        }
    }
}

/// User-facing summary of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Rows in the table.
    pub total_runs: usize,
    /// Runs that reached `Prepared`.
    pub prepared: usize,
    /// Failed runs with their rendered cause.
    pub failures: Vec<(RunNumber, String)>,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "prepared {} of {} runs, {} failed",
            self.prepared,
            self.total_runs,
            self.failures.len()
        )?;
        for (run, cause) in &self.failures {
            writeln!(f, "  run {run}: {cause}")?;
        }
        Ok(())
    }
}

/// Turns a parameter table into prepared run descriptors.
#[derive(Clone)]
pub struct EnsembleBuilder {
    root: PathBuf,
    run_log: PathBuf,
    surface: Arc<dyn SurfaceGenerator>,
    renderer: Arc<dyn DiagnosticRenderer>,
    overwrite: OverwritePolicy,
    parallelism: usize,
}

impl fmt::Debug for EnsembleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsembleBuilder")
            .field("root", &self.root)
            .field("run_log", &self.run_log)
            .field("overwrite", &self.overwrite)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl EnsembleBuilder {
    /// Builder rooted at `root` with the default fault model and run log name.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config = EnsembleConfig::default();
        Self {
            run_log: root.join(&config.layout.run_log),
            root,
            surface: Arc::new(SubfaultSurface::new(config.fault.clone(), config.grid)),
            renderer: Arc::new(SlipPlotRenderer::new(config.fault, config.figure)),
            overwrite: config.overwrite,
            parallelism: config.parallelism,
        }
    }

    /// Builder for `config` below the base output directory `base`.
    pub fn from_config(config: &EnsembleConfig, base: &Path) -> Self {
        Self {
            root: config.ensemble_root(base),
            run_log: config.run_log_path(base),
            surface: Arc::new(SubfaultSurface::new(config.fault.clone(), config.grid.clone())),
            renderer: Arc::new(SlipPlotRenderer::new(config.fault.clone(), config.figure)),
            overwrite: config.overwrite,
            parallelism: config.parallelism,
        }
    }

    /// Writes the run log to `path` instead of the root.
    pub fn with_run_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.run_log = path.into();
        self
    }

    /// Replaces the deformation model.
    pub fn with_surface_generator(mut self, generator: impl SurfaceGenerator + 'static) -> Self {
        self.surface = Arc::new(generator);
        self
    }

    /// Replaces the diagnostic renderer.
    pub fn with_renderer(mut self, renderer: impl DiagnosticRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Sets the policy for existing artifacts.
    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Worker threads for preparation (0 is treated as 1).
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Directory holding the run directories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the run log.
    pub fn run_log_path(&self) -> &Path {
        &self.run_log
    }

    /// One `Pending` descriptor per table row, numbered by position.
    pub fn describe(&self, table: &ParameterTable) -> Vec<RunDescriptor> {
        table
            .iter()
            .enumerate()
            .map(|(idx, params)| {
                RunDescriptor::new(
                    RunNumber::from_index(idx),
                    params.clone(),
                    &self.root,
                    self.renderer.extension(),
                )
            })
            .collect()
    }

    /// Builds the ensemble: statistics, durable run log, then per-run preparation.
    ///
    /// Failing to write the run log aborts before any artifact is generated.
    /// Preparation failures are collected per run and never abort siblings.
    pub fn build(&self, table: &ParameterTable) -> Result<Ensemble, EnsembleError> {
        info!(runs = table.len(), root = %self.root.display(), "building ensemble");
        let descriptors = self.describe(table);
        let statistics = Arc::new(EnsembleStatistics::compute(table.rows()));

        let mut log = RunLog::open(&self.run_log)?;
        for descriptor in &descriptors {
            log.append(descriptor.run_number(), descriptor.parameters())?;
        }
        let run_log = log.close()?;
        info!(entries = descriptors.len(), path = %run_log.display(), "run log written");

        let (runs, failures) = self.prepare_all(descriptors, &statistics)?;
        info!(prepared = runs.len(), failed = failures.len(), "preparation finished");
        Ok(Ensemble {
            statistics,
            runs,
            failures,
            run_log,
            total_runs: table.len(),
        })
    }

    /// Re-derives runs from an existing run log without rewriting it.
    ///
    /// Statistics cover every logged run, so regenerated artifacts match the
    /// original build. `selection` restricts which runs are re-prepared.
    pub fn replay(&self, selection: Option<&[RunNumber]>) -> Result<Ensemble, EnsembleError> {
        let entries = read_run_log(&self.run_log)?;
        let table = ParameterTable::from_vectors(
            entries.into_iter().map(|entry| entry.parameters).collect(),
        )?;
        let statistics = Arc::new(EnsembleStatistics::compute(table.rows()));
        let mut descriptors = self.describe(&table);
        if let Some(selected) = selection {
            if let Some(missing) = selected.iter().find(|run| run.index() >= table.len()) {
                return Err(EnsembleError::MalformedTable(
                    ErrorInfo::new("replay-unknown-run", "run log has no entry for run")
                        .with_context("run_number", missing.to_string())
                        .with_context("path", self.run_log.display().to_string()),
                ));
            }
            descriptors.retain(|descriptor| selected.contains(&descriptor.run_number()));
        }
        info!(runs = descriptors.len(), path = %self.run_log.display(), "replaying run log");

        let (runs, failures) = self.prepare_all(descriptors, &statistics)?;
        Ok(Ensemble {
            statistics,
            runs,
            failures,
            run_log: self.run_log.clone(),
            total_runs: table.len(),
        })
    }

    fn prepare_all(
        &self,
        mut descriptors: Vec<RunDescriptor>,
        statistics: &EnsembleStatistics,
    ) -> Result<(Vec<RunDescriptor>, Vec<RunFailure>), EnsembleError> {
        let ctx = ArtifactContext {
            surface: self.surface.as_ref(),
            renderer: self.renderer.as_ref(),
            overwrite: self.overwrite,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism.max(1))
            .build()
            .map_err(|err| EnsembleError::Io(ErrorInfo::new("thread-pool", err.to_string())))?;

        let outcomes: Vec<Result<(), EnsembleError>> = pool.install(|| {
            descriptors
                .par_iter_mut()
                .map(|descriptor| descriptor.prepare(statistics, &ctx).map(|_| ()))
                .collect()
        });

        let mut prepared = Vec::with_capacity(descriptors.len());
        let mut failures = Vec::new();
        for (mut descriptor, outcome) in descriptors.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => prepared.push(descriptor),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(run = %descriptor.run_number(), error = %err, "run preparation failed");
                    descriptor.fail(err.to_string())?;
                    failures.push(RunFailure {
                        run_number: descriptor.run_number(),
                        error: err,
                    });
                }
            }
        }
        Ok((prepared, failures))
    }
}
