#![deny(missing_docs)]
//! Submission of prepared runs to a batch executor.
//!
//! [`ExecutionHandoff`] validates and orders a batch, hands it to a
//! [`BatchExecutor`] and returns a [`BatchController`] that relays the
//! executor's per-run reports back into each run's status.

/// Controller handle returned by a submission.
pub mod controller;
/// Executor contract and the job/event types crossing it.
pub mod executor;
/// Batch validation and submission.
pub mod handoff;
/// Executors shipped with the crate.
pub mod local;

pub use controller::{BatchController, BatchSummary};
pub use executor::{BatchExecutor, JobSpec, RunEvent, RunOutcome, StatusReporter, SubmitOptions};
pub use handoff::{ExecutionHandoff, SubmitError};
pub use local::{DryRunExecutor, LocalExecutor, OUTCOME_PLOT};
