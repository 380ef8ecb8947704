use std::fmt;
use std::sync::mpsc::{Receiver, TryRecvError};

use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_ensemble::{RunStatus, RunUnit};
use tracing::{debug, info, warn};

use crate::executor::{RunEvent, RunOutcome, SubmitOptions};

/// Counts of runs per lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Runs handed to the executor.
    pub submitted: usize,
    /// Runs still waiting for a report.
    pub in_flight: usize,
    /// Runs reported successful.
    pub completed: usize,
    /// Runs reported failed.
    pub failed: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted {} runs: {} completed, {} failed, {} in flight",
            self.submitted, self.completed, self.failed, self.in_flight
        )
    }
}

/// Handle on a submitted batch.
///
/// Owns the submitted runs and applies executor reports to them; runs are
/// kept in run-number order.
pub struct BatchController<D> {
    name: String,
    executable: String,
    executor: String,
    options: SubmitOptions,
    runs: Vec<D>,
    events: Option<Receiver<RunEvent>>,
}

impl<D: RunUnit> BatchController<D> {
    pub(crate) fn new(
        name: String,
        executable: String,
        executor: String,
        options: SubmitOptions,
        runs: Vec<D>,
        events: Option<Receiver<RunEvent>>,
    ) -> Self {
        Self {
            name,
            executable,
            executor,
            options,
            runs,
            events,
        }
    }

    /// Ensemble name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options the batch was submitted with.
    pub fn options(&self) -> SubmitOptions {
        self.options
    }

    /// Submitted runs in run-number order.
    pub fn runs(&self) -> &[D] {
        &self.runs
    }

    /// Releases the runs.
    pub fn into_runs(self) -> Vec<D> {
        self.runs
    }

    /// True once every run is terminal or the executor stopped reporting.
    pub fn is_finished(&self) -> bool {
        self.events.is_none() || self.runs.iter().all(|run| run.status().is_terminal())
    }

    /// Applies every report already received without blocking.
    ///
    /// Returns the number of reports applied.
    pub fn poll(&mut self) -> Result<usize, EnsembleError> {
        let mut applied = 0;
        loop {
            let Some(events) = &self.events else {
                return Ok(applied);
            };
            match events.try_recv() {
                Ok(event) => {
                    self.apply(event)?;
                    applied += 1;
                }
                Err(TryRecvError::Empty) => return Ok(applied),
                Err(TryRecvError::Disconnected) => {
                    self.disconnect();
                    return Ok(applied);
                }
            }
        }
    }

    /// Blocks until every run is terminal or the executor stops reporting.
    pub fn wait(&mut self) -> Result<BatchSummary, EnsembleError> {
        while !self.runs.iter().all(|run| run.status().is_terminal()) {
            let Some(events) = &self.events else {
                break;
            };
            match events.recv() {
                Ok(event) => self.apply(event)?,
                Err(_) => self.disconnect(),
            }
        }
        let summary = self.summary();
        info!(name = %self.name, %summary, "batch finished");
        Ok(summary)
    }

    /// Counts runs per state.
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            submitted: self.runs.len(),
            ..BatchSummary::default()
        };
        for run in &self.runs {
            match run.status() {
                RunStatus::Completed => summary.completed += 1,
                RunStatus::Failed => summary.failed += 1,
                _ => summary.in_flight += 1,
            }
        }
        summary
    }

    fn disconnect(&mut self) {
        if self.events.take().is_some() {
            let pending = self
                .runs
                .iter()
                .filter(|run| !run.status().is_terminal())
                .count();
            if pending > 0 {
                debug!(executor = %self.executor, pending, "executor stopped reporting");
            }
        }
    }

    fn apply(&mut self, event: RunEvent) -> Result<(), EnsembleError> {
        let idx = self
            .runs
            .binary_search_by_key(&event.run_number, |run| run.run_number())
            .map_err(|_| {
                EnsembleError::InvalidState(
                    ErrorInfo::new("unknown-run", "executor reported a run outside the batch")
                        .with_context("run_number", event.run_number.to_string())
                        .with_context("executor", self.executor.clone()),
                )
            })?;
        let run = &mut self.runs[idx];
        match event.outcome {
            RunOutcome::Completed => {
                debug!(run = %event.run_number, attempts = event.attempts, "run completed");
                run.transition(RunStatus::Completed)
            }
            RunOutcome::Failed(cause) => {
                warn!(run = %event.run_number, attempts = event.attempts, %cause, "run failed");
                run.fail(cause)
            }
        }
    }
}

impl<D: RunUnit> fmt::Display for BatchController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ensemble {} ({})", self.name, self.executor)?;
        writeln!(f, "  executable: {}", self.executable)?;
        writeln!(
            f,
            "  block_until_complete: {}, auto_plot: {}",
            self.options.block_until_complete, self.options.auto_plot
        )?;
        for run in &self.runs {
            writeln!(
                f,
                "  {:<10} {:<10} {}  slips: {}",
                run.prefix(),
                run.status().as_str(),
                run.working_dir().display(),
                run.parameters().to_log_fields()
            )?;
        }
        write!(f, "  {}", self.summary())
    }
}

impl<D: RunUnit> fmt::Debug for BatchController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchController")
            .field("name", &self.name)
            .field("executor", &self.executor)
            .field("options", &self.options)
            .field("summary", &self.summary())
            .finish_non_exhaustive()
    }
}
