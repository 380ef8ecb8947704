use std::error::Error;
use std::fmt;
use std::sync::mpsc::Receiver;

use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_ensemble::{EnsembleConfig, RunStatus, RunUnit};
use tracing::info;

use crate::controller::BatchController;
use crate::executor::{status_channel, BatchExecutor, JobSpec, RunEvent, SubmitOptions};

/// Hands prepared runs to a [`BatchExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutionHandoff<E> {
    executor: E,
    name: String,
    executable: String,
}

impl<E: BatchExecutor> ExecutionHandoff<E> {
    /// Handoff submitting `executable` runs of ensemble `name` to `executor`.
    pub fn new(executor: E, name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            executor,
            name: name.into(),
            executable: executable.into(),
        }
    }

    /// Handoff using the configured ensemble name and executable.
    pub fn from_config(executor: E, config: &EnsembleConfig) -> Self {
        Self::new(executor, config.name.clone(), config.executable.clone())
    }

    /// The wrapped executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Submits `runs` as one ordered batch.
    ///
    /// Every run must be `Prepared` and run numbers must be unique; otherwise
    /// nothing is submitted and an [`EnsembleError::InvalidState`] is
    /// returned. An empty batch never reaches the executor. Runs move to
    /// `Submitted` only once the executor accepted the batch. With
    /// `block_until_complete` the call returns once every run is terminal.
    ///
    /// On error the runs are handed back inside the [`SubmitError`].
    pub fn submit<D: RunUnit>(
        &self,
        mut runs: Vec<D>,
        options: SubmitOptions,
    ) -> Result<BatchController<D>, SubmitError<D>> {
        let not_prepared = runs
            .iter()
            .find(|run| run.status() != RunStatus::Prepared)
            .map(|run| {
                EnsembleError::InvalidState(
                    ErrorInfo::new("submit-not-prepared", "only prepared runs can be submitted")
                        .with_context("run_number", run.run_number().to_string())
                        .with_context("status", run.status().to_string()),
                )
            });
        if let Some(error) = not_prepared {
            return Err(SubmitError { error, runs });
        }
        runs.sort_by_key(|run| run.run_number());
        let duplicate = runs
            .windows(2)
            .find(|pair| pair[0].run_number() == pair[1].run_number())
            .map(|pair| {
                EnsembleError::InvalidState(
                    ErrorInfo::new("submit-duplicate", "run submitted twice in one batch")
                        .with_context("run_number", pair[0].run_number().to_string()),
                )
            });
        if let Some(error) = duplicate {
            return Err(SubmitError { error, runs });
        }

        if runs.is_empty() {
            info!(name = %self.name, "empty batch, nothing submitted");
            return Ok(self.controller(options, runs, None));
        }

        let batch: Vec<JobSpec> = runs
            .iter()
            .map(|run| JobSpec {
                run_number: run.run_number(),
                prefix: run.prefix(),
                executable: self.executable.clone(),
                working_dir: run.working_dir().to_path_buf(),
            })
            .collect();

        let (reporter, events) = status_channel();
        info!(
            name = %self.name,
            executor = self.executor.name(),
            runs = batch.len(),
            "submitting batch"
        );
        if let Err(error) = self.executor.launch(batch, options, reporter) {
            return Err(SubmitError { error, runs });
        }
        // reports wait in the channel until the controller applies them
        let transitioned = runs
            .iter_mut()
            .try_for_each(|run| run.transition(RunStatus::Submitted));
        if let Err(error) = transitioned {
            return Err(SubmitError { error, runs });
        }

        let mut controller = self.controller(options, runs, Some(events));
        let relayed = if options.block_until_complete {
            controller.wait().map(|_| ())
        } else {
            controller.poll().map(|_| ())
        };
        match relayed {
            Ok(()) => Ok(controller),
            Err(error) => Err(SubmitError {
                error,
                runs: controller.into_runs(),
            }),
        }
    }

    fn controller<D: RunUnit>(
        &self,
        options: SubmitOptions,
        runs: Vec<D>,
        events: Option<Receiver<RunEvent>>,
    ) -> BatchController<D> {
        BatchController::new(
            self.name.clone(),
            self.executable.clone(),
            self.executor.name().to_string(),
            options,
            runs,
            events,
        )
    }
}

/// A rejected or failed submission, carrying the runs back to the caller.
pub struct SubmitError<D> {
    /// Why the submission failed.
    pub error: EnsembleError,
    /// The submitted runs, in their state at the time of failure.
    pub runs: Vec<D>,
}

impl<D> SubmitError<D> {
    /// Structured detail of the underlying error.
    pub fn info(&self) -> &ErrorInfo {
        self.error.info()
    }

    /// Recovers the runs, dropping the error.
    pub fn into_runs(self) -> Vec<D> {
        self.runs
    }
}

impl<D> From<SubmitError<D>> for EnsembleError {
    fn from(err: SubmitError<D>) -> Self {
        err.error
    }
}

impl<D> fmt::Debug for SubmitError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError")
            .field("error", &self.error)
            .field("runs", &self.runs.len())
            .finish()
    }
}

impl<D> fmt::Display for SubmitError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} runs returned)", self.error, self.runs.len())
    }
}

impl<D> Error for SubmitError<D> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}
