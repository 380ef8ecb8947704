use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use slip_batch::{
    BatchExecutor, DryRunExecutor, ExecutionHandoff, JobSpec, StatusReporter, SubmitOptions,
};
use slip_ensemble::{
    Ensemble, EnsembleBuilder, EnsembleError, ErrorInfo, FaultGeometry, GridSpec, ParameterTable,
    RunDescriptor, RunNumber, RunStatus, RunUnit, SubfaultSurface,
};
use tempfile::tempdir;

fn builder(root: &Path) -> EnsembleBuilder {
    EnsembleBuilder::new(root).with_surface_generator(SubfaultSurface::new(
        FaultGeometry::default(),
        GridSpec {
            spacing: 0.25,
            padding: 0.5,
        },
    ))
}

fn prepared(root: &Path, runs: usize) -> Ensemble {
    let rows = (0..runs).map(|idx| vec![10.0 * (idx + 1) as f64, 5.0]).collect();
    let table = ParameterTable::from_rows(rows).expect("table");
    builder(root).build(&table).expect("build")
}

/// Reports synchronously from `launch`, failing the listed runs.
#[derive(Default)]
struct RecordingExecutor {
    fail: BTreeSet<u64>,
    batches: Mutex<Vec<Vec<JobSpec>>>,
}

impl RecordingExecutor {
    fn failing(runs: &[u64]) -> Self {
        Self {
            fail: runs.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn batches(&self) -> Vec<Vec<JobSpec>> {
        self.batches.lock().expect("lock").clone()
    }
}

impl BatchExecutor for RecordingExecutor {
    fn name(&self) -> &str {
        "recording"
    }

    fn launch(
        &self,
        batch: Vec<JobSpec>,
        _options: SubmitOptions,
        reporter: StatusReporter,
    ) -> Result<(), EnsembleError> {
        for job in &batch {
            if self.fail.contains(&job.run_number.as_raw()) {
                reporter.failed(job.run_number, "simulation diverged", 1);
            } else {
                reporter.completed(job.run_number, 1);
            }
        }
        self.batches.lock().expect("lock").push(batch);
        Ok(())
    }
}

struct StrayReporter;

impl BatchExecutor for StrayReporter {
    fn name(&self) -> &str {
        "stray"
    }

    fn launch(
        &self,
        _batch: Vec<JobSpec>,
        _options: SubmitOptions,
        reporter: StatusReporter,
    ) -> Result<(), EnsembleError> {
        reporter.completed(RunNumber::from_raw(99), 1);
        Ok(())
    }
}

/// Rejects every batch as if its queue were unavailable.
struct UnavailableQueue;

impl BatchExecutor for UnavailableQueue {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn launch(
        &self,
        _batch: Vec<JobSpec>,
        _options: SubmitOptions,
        _reporter: StatusReporter,
    ) -> Result<(), EnsembleError> {
        Err(EnsembleError::Io(ErrorInfo::new(
            "queue-down",
            "scheduler unavailable",
        )))
    }
}

const BLOCKING: SubmitOptions = SubmitOptions {
    block_until_complete: true,
    auto_plot: false,
};

#[test]
fn blocking_submit_relays_every_outcome() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 3);
    let executor = RecordingExecutor::failing(&[1]);
    let handoff = ExecutionHandoff::new(&executor, "fidelity-test", "xgeoclaw");

    let mut runs = ensemble.runs;
    runs.reverse();
    let controller = handoff.submit(runs, BLOCKING).expect("submit");

    let statuses: Vec<RunStatus> = controller.runs().iter().map(RunUnit::status).collect();
    assert_eq!(
        statuses,
        vec![RunStatus::Completed, RunStatus::Failed, RunStatus::Completed]
    );
    assert_eq!(controller.runs()[1].failure(), Some("simulation diverged"));
    let summary = controller.summary();
    assert_eq!((summary.submitted, summary.completed, summary.failed), (3, 2, 1));
    assert!(controller.is_finished());

    let batches = executor.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    let numbers: Vec<u64> = batch.iter().map(|job| job.run_number.as_raw()).collect();
    assert_eq!(numbers, vec![0, 1, 2]);
    assert_eq!(batch[2].prefix, "run_2");
    assert_eq!(batch[2].executable, "xgeoclaw");
    assert_eq!(batch[2].working_dir, dir.path().join("run_2"));
}

#[test]
fn non_blocking_submit_can_be_polled() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 2);
    let executor = RecordingExecutor::default();
    let handoff = ExecutionHandoff::new(&executor, "trial", "xgeoclaw");
    let mut controller = handoff
        .submit(ensemble.runs, SubmitOptions::default())
        .expect("submit");
    controller.poll().expect("poll");
    let summary = controller.wait().expect("wait");
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.in_flight, 0);
}

#[test]
fn pending_runs_are_rejected_before_launch() {
    let dir = tempdir().expect("tempdir");
    let table = ParameterTable::from_rows(vec![vec![1.0], vec![2.0]]).expect("table");
    let pending = builder(dir.path()).describe(&table);
    let executor = RecordingExecutor::default();
    let handoff = ExecutionHandoff::new(&executor, "trial", "xgeoclaw");

    let err = handoff
        .submit(pending, BLOCKING)
        .expect_err("pending runs cannot be submitted");
    assert!(matches!(err.error, EnsembleError::InvalidState(_)));
    assert_eq!(err.info().code, "submit-not-prepared");
    assert!(executor.batches().is_empty());
    let returned = err.into_runs();
    assert_eq!(returned.len(), 2);
    assert!(returned.iter().all(|run| run.status() == RunStatus::Pending));
}

#[test]
fn failed_runs_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let mut ensemble = prepared(dir.path(), 2);
    let table = ParameterTable::from_rows(vec![vec![3.0, 5.0]]).expect("table");
    let mut failed: RunDescriptor = builder(dir.path()).describe(&table).remove(0);
    failed.fail("surface generation failed".to_string()).expect("fail");
    ensemble.runs.push(failed);

    let executor = RecordingExecutor::default();
    let err = ExecutionHandoff::new(&executor, "trial", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect_err("failed run in batch");
    assert_eq!(err.info().context_value("status"), Some("failed"));
    assert!(executor.batches().is_empty());
}

#[test]
fn duplicate_runs_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let mut ensemble = prepared(dir.path(), 2);
    let copy = ensemble.runs[0].clone();
    ensemble.runs.push(copy);
    let executor = RecordingExecutor::default();
    let err = ExecutionHandoff::new(&executor, "trial", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect_err("duplicate run");
    assert_eq!(err.info().code, "submit-duplicate");
}

#[test]
fn refused_launch_hands_back_prepared_runs() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 2);
    let err = ExecutionHandoff::new(UnavailableQueue, "trial", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect_err("queue refused the batch");
    assert!(matches!(err.error, EnsembleError::Io(_)));
    assert_eq!(err.info().code, "queue-down");

    let runs = err.into_runs();
    let numbers: Vec<u64> = runs.iter().map(|run| run.run_number().as_raw()).collect();
    assert_eq!(numbers, vec![0, 1]);
    assert!(runs.iter().all(|run| run.status() == RunStatus::Prepared));

    // the same runs can be resubmitted elsewhere
    let executor = RecordingExecutor::default();
    let controller = ExecutionHandoff::new(&executor, "trial", "xgeoclaw")
        .submit(runs, BLOCKING)
        .expect("resubmit");
    assert_eq!(controller.summary().completed, 2);
}

#[test]
fn empty_batch_never_reaches_the_executor() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 0);
    let executor = RecordingExecutor::default();
    let controller = ExecutionHandoff::new(&executor, "trial", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect("submit");
    assert!(controller.runs().is_empty());
    assert!(controller.is_finished());
    assert!(executor.batches().is_empty());
}

#[test]
fn reports_for_unknown_runs_are_invalid_state() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 1);
    let err = ExecutionHandoff::new(StrayReporter, "trial", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect_err("stray report");
    assert_eq!(err.info().code, "unknown-run");
}

#[test]
fn dry_run_leaves_runs_submitted() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 2);
    let mut controller = ExecutionHandoff::new(DryRunExecutor, "trial", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect("submit");
    assert!(controller
        .runs()
        .iter()
        .all(|run| run.status() == RunStatus::Submitted));
    let summary = controller.wait().expect("wait");
    assert_eq!(summary.in_flight, 2);
    assert!(controller.is_finished());
}

#[test]
fn controller_display_lists_runs() {
    let dir = tempdir().expect("tempdir");
    let ensemble = prepared(dir.path(), 2);
    let executor = RecordingExecutor::failing(&[0]);
    let controller = ExecutionHandoff::new(&executor, "fidelity-test", "xgeoclaw")
        .submit(ensemble.runs, BLOCKING)
        .expect("submit");
    let text = controller.to_string();
    assert!(text.starts_with("ensemble fidelity-test (recording)"));
    assert!(text.contains("executable: xgeoclaw"));
    assert!(text.contains("block_until_complete: true, auto_plot: false"));
    assert!(text.contains("run_0      failed"));
    assert!(text.contains("run_1      completed"));
    assert!(text.contains("slips: 10.0 5.0\n"));
    assert!(text.contains("slips: 20.0 5.0\n"));
    assert!(text.contains("1 completed, 1 failed"));
}
