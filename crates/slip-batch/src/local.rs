use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use rayon::prelude::*;
use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::RunNumber;
use slip_ensemble::figures::render_outcome_svg;
use slip_ensemble::FigureConfig;
use tracing::{debug, info, warn};

use crate::executor::{BatchExecutor, JobSpec, StatusReporter, SubmitOptions};

/// File name of the aggregate outcome plot written with `auto_plot`.
pub const OUTCOME_PLOT: &str = "batch_outcomes.svg";

/// Runs each job's executable as a local process.
///
/// Jobs run on a dedicated thread pool in the background; `launch` returns
/// as soon as the pool is started. Output of every attempt is appended to
/// `<working_dir>/<prefix>_log.txt`.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    /// Jobs executed concurrently (0 is treated as 1).
    pub parallelism: usize,
    /// Attempts per job before it is reported failed.
    pub max_retries: u32,
    /// Directory receiving the aggregate plot; defaults to the parent of the
    /// first job's working directory.
    pub plot_dir: Option<PathBuf>,
    /// Canvas of the aggregate plot.
    pub figure: FigureConfig,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self {
            parallelism: 1,
            max_retries: 1,
            plot_dir: None,
            figure: FigureConfig::default(),
        }
    }
}

impl LocalExecutor {
    /// Executor with the given concurrency and retry budget.
    pub fn new(parallelism: usize, max_retries: u32) -> Self {
        Self {
            parallelism,
            max_retries,
            ..Self::default()
        }
    }

    /// Log file receiving a job's stdout and stderr.
    pub fn log_path(job: &JobSpec) -> PathBuf {
        job.working_dir.join(format!("{}_log.txt", job.prefix))
    }
}

impl BatchExecutor for LocalExecutor {
    fn name(&self) -> &str {
        "local"
    }

    fn launch(
        &self,
        batch: Vec<JobSpec>,
        options: SubmitOptions,
        reporter: StatusReporter,
    ) -> Result<(), EnsembleError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism.max(1))
            .build()
            .map_err(|err| EnsembleError::Io(ErrorInfo::new("thread-pool", err.to_string())))?;
        let max_retries = self.max_retries;
        let plot_dir = self.plot_dir.clone().or_else(|| {
            batch
                .first()
                .and_then(|job| job.working_dir.parent())
                .map(Path::to_path_buf)
        });
        let figure = self.figure;

        thread::Builder::new()
            .name("slip-batch-local".to_string())
            .spawn(move || {
                let outcomes: Vec<(RunNumber, bool)> = pool.install(|| {
                    batch
                        .par_iter()
                        .map(|job| {
                            let ok = match run_with_retries(job, max_retries) {
                                Ok(attempts) => {
                                    reporter.completed(job.run_number, attempts);
                                    true
                                }
                                Err(failure) => {
                                    reporter.failed(job.run_number, failure.error, failure.attempts);
                                    false
                                }
                            };
                            (job.run_number, ok)
                        })
                        .collect()
                });
                if options.auto_plot {
                    if let Some(dir) = plot_dir {
                        write_outcome_plot(&dir, &outcomes, &figure);
                    }
                }
                info!(jobs = outcomes.len(), "local batch drained");
            })
            .map_err(|err| EnsembleError::Io(ErrorInfo::new("executor-spawn", err.to_string())))?;
        Ok(())
    }
}

struct JobFailure {
    attempts: u32,
    error: String,
}

fn run_with_retries(job: &JobSpec, max_retries: u32) -> Result<u32, JobFailure> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match run_once(job) {
            Ok(()) => return Ok(attempt),
            Err(err) if attempt < max_retries.max(1) => {
                debug!(run = %job.run_number, attempt, error = %err, "retrying job");
                continue;
            }
            Err(err) => {
                return Err(JobFailure {
                    attempts: attempt,
                    error: err,
                })
            }
        }
    }
}

fn run_once(job: &JobSpec) -> Result<(), String> {
    let log_path = LocalExecutor::log_path(job);
    let stdout = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|err| format!("cannot open {}: {err}", log_path.display()))?;
    let stderr = stdout
        .try_clone()
        .map_err(|err| format!("cannot open {}: {err}", log_path.display()))?;
    let status = Command::new(&job.executable)
        .current_dir(&job.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|err| format!("cannot start {}: {err}", job.executable))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} exited with {status}", job.executable))
    }
}

fn write_outcome_plot(dir: &Path, outcomes: &[(RunNumber, bool)], figure: &FigureConfig) {
    let mut sorted = outcomes.to_vec();
    sorted.sort_by_key(|(run, _)| *run);
    let path = dir.join(OUTCOME_PLOT);
    let result = File::create(&path).and_then(|mut file| {
        file.write_all(render_outcome_svg(&sorted, figure).as_bytes())?;
        file.sync_all()
    });
    match result {
        Ok(()) => debug!(path = %path.display(), "outcome plot written"),
        Err(err) => warn!(path = %path.display(), error = %err, "outcome plot not written"),
    }
}

/// Logs the batch without running anything.
///
/// Runs stay `Submitted`; the controller sees the executor stop reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl BatchExecutor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn launch(
        &self,
        batch: Vec<JobSpec>,
        options: SubmitOptions,
        reporter: StatusReporter,
    ) -> Result<(), EnsembleError> {
        for job in &batch {
            info!(
                run = %job.run_number,
                prefix = %job.prefix,
                executable = %job.executable,
                dir = %job.working_dir.display(),
                "dry run"
            );
        }
        debug!(
            block = options.block_until_complete,
            auto_plot = options.auto_plot,
            "dry run options"
        );
        drop(reporter);
        Ok(())
    }
}
