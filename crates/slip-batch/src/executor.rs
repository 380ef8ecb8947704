use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};
use slip_core::errors::EnsembleError;
use slip_core::RunNumber;

/// Toggles forwarded to the executor with every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Block in `submit` until every run reached a terminal state.
    pub block_until_complete: bool,
    /// Ask the executor to render its own aggregate plots.
    pub auto_plot: bool,
}

/// One run of a submission batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Run identifier within the ensemble.
    pub run_number: RunNumber,
    /// Collision-free naming prefix (`run_<n>`).
    pub prefix: String,
    /// Simulation executable to invoke.
    pub executable: String,
    /// Directory holding the run's prepared artifacts.
    pub working_dir: PathBuf,
}

/// Final result of one run as seen by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The simulation finished successfully.
    Completed,
    /// The simulation failed; carries the cause.
    Failed(String),
}

/// Per-run report sent from the executor to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    /// Run the report refers to.
    pub run_number: RunNumber,
    /// Terminal outcome.
    pub outcome: RunOutcome,
    /// Attempts the executor used.
    pub attempts: u32,
}

/// Sending side of the status channel handed to an executor.
///
/// Dropping every clone tells the controller that no further reports will
/// arrive.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    sender: Sender<RunEvent>,
}

impl StatusReporter {
    /// Sends a report. Returns false once the controller has been dropped.
    pub fn report(&self, run_number: RunNumber, outcome: RunOutcome, attempts: u32) -> bool {
        self.sender
            .send(RunEvent {
                run_number,
                outcome,
                attempts,
            })
            .is_ok()
    }

    /// Reports a successful run.
    pub fn completed(&self, run_number: RunNumber, attempts: u32) -> bool {
        self.report(run_number, RunOutcome::Completed, attempts)
    }

    /// Reports a failed run.
    pub fn failed(&self, run_number: RunNumber, cause: impl Into<String>, attempts: u32) -> bool {
        self.report(run_number, RunOutcome::Failed(cause.into()), attempts)
    }
}

pub(crate) fn status_channel() -> (StatusReporter, Receiver<RunEvent>) {
    let (sender, receiver) = mpsc::channel();
    (StatusReporter { sender }, receiver)
}

/// External system that schedules and runs submitted jobs.
///
/// The executor owns concurrency, retries and resource scheduling. It may
/// report synchronously from `launch` or asynchronously from other threads.
pub trait BatchExecutor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Accepts an ordered batch. Returning an error means nothing was started.
    fn launch(
        &self,
        batch: Vec<JobSpec>,
        options: SubmitOptions,
        reporter: StatusReporter,
    ) -> Result<(), EnsembleError>;
}

impl<E: BatchExecutor + ?Sized> BatchExecutor for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn launch(
        &self,
        batch: Vec<JobSpec>,
        options: SubmitOptions,
        reporter: StatusReporter,
    ) -> Result<(), EnsembleError> {
        (**self).launch(batch, options, reporter)
    }
}
