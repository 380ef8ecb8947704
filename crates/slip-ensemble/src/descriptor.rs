//! Per-run descriptors and their lifecycle.
//!
//! ```text
//! Pending -> Prepared -> Submitted -> Completed
//!    |                        \
//!    +--------> Failed <-------+
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::{ParameterVector, RunNumber};
use tracing::debug;

use crate::figures::DiagnosticRenderer;
use crate::hash::bytes_sha256;
use crate::stats::EnsembleStatistics;
use crate::surface::SurfaceGenerator;

/// Name of the deformation surface inside a run directory.
pub const SURFACE_FILE: &str = "dtopo.tt3";
/// Stem of the diagnostic plot inside a run directory.
pub const PLOT_STEM: &str = "fault_slip";

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Constructed, no artifacts generated.
    Pending,
    /// Surface and diagnostic plot written; ready for the executor.
    Prepared,
    /// Handed to the executor.
    Submitted,
    /// Executor reported success.
    Completed,
    /// Preparation or execution failed.
    Failed,
}

impl RunStatus {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Legal edges of the lifecycle state machine.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Prepared)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Prepared, RunStatus::Submitted)
                | (RunStatus::Submitted, RunStatus::Completed)
                | (RunStatus::Submitted, RunStatus::Failed)
        )
    }

    /// Lower-case name, as logged and displayed.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Prepared => "prepared",
            RunStatus::Submitted => "submitted",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when an artifact already exists at a run's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Replace existing artifacts with freshly generated ones.
    #[default]
    Overwrite,
    /// Fail the run's preparation if an artifact already exists.
    Refuse,
}

/// Filesystem locations owned by one run; a pure function of the run number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPaths {
    /// Working directory handed to the executor.
    pub run_dir: PathBuf,
    /// Deformation surface consumed by the simulation.
    pub surface: PathBuf,
    /// Diagnostic plot.
    pub plot: PathBuf,
}

impl RunPaths {
    /// Derives the paths of `run` under the ensemble root.
    pub fn derive(root: &Path, run: RunNumber, plot_extension: &str) -> Self {
        let run_dir = root.join(run.prefix());
        Self {
            surface: run_dir.join(SURFACE_FILE),
            plot: run_dir.join(format!("{PLOT_STEM}.{plot_extension}")),
            run_dir,
        }
    }
}

/// SHA-256 digests of a prepared run's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigests {
    /// Digest of the dtopo surface.
    pub surface: String,
    /// Digest of the diagnostic plot.
    pub plot: String,
}

/// Collaborators needed to prepare a run.
#[derive(Clone, Copy)]
pub struct ArtifactContext<'a> {
    /// Deformation model.
    pub surface: &'a dyn SurfaceGenerator,
    /// Diagnostic plot renderer.
    pub renderer: &'a dyn DiagnosticRenderer,
    /// What to do with artifacts left by an earlier build.
    pub overwrite: OverwritePolicy,
}

impl fmt::Debug for ArtifactContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactContext")
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

/// Capability interface the execution layer consumes.
pub trait RunUnit: Send {
    /// Stable identifier within the ensemble.
    fn run_number(&self) -> RunNumber;

    /// Collision-free naming prefix.
    fn prefix(&self) -> String {
        self.run_number().prefix()
    }

    /// Parameters this run was derived from.
    fn parameters(&self) -> &ParameterVector;

    /// Working directory the executable runs in.
    fn working_dir(&self) -> &Path;

    /// Current lifecycle state.
    fn status(&self) -> RunStatus;

    /// Generates the run's artifacts against ensemble-wide statistics.
    fn prepare(
        &mut self,
        stats: &EnsembleStatistics,
        ctx: &ArtifactContext<'_>,
    ) -> Result<ArtifactDigests, EnsembleError>;

    /// Moves the run along a legal lifecycle edge.
    fn transition(&mut self, next: RunStatus) -> Result<(), EnsembleError>;

    /// Marks the run failed, recording the cause.
    fn fail(&mut self, cause: String) -> Result<(), EnsembleError>;
}

/// Per-run job descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescriptor {
    run_number: RunNumber,
    parameters: ParameterVector,
    paths: RunPaths,
    status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digests: Option<ArtifactDigests>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl RunDescriptor {
    /// Creates a `Pending` descriptor rooted at `root`.
    pub fn new(
        run_number: RunNumber,
        parameters: ParameterVector,
        root: &Path,
        plot_extension: &str,
    ) -> Self {
        Self {
            paths: RunPaths::derive(root, run_number, plot_extension),
            run_number,
            parameters,
            status: RunStatus::Pending,
            digests: None,
            failure: None,
        }
    }

    /// Locations of this run's directory and artifacts.
    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Path of the generated deformation surface.
    pub fn artifact_path(&self) -> &Path {
        &self.paths.surface
    }

    /// Artifact digests, once prepared.
    pub fn digests(&self) -> Option<&ArtifactDigests> {
        self.digests.as_ref()
    }

    /// Cause recorded when the run failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn prepare_error(&self, info: ErrorInfo) -> EnsembleError {
        EnsembleError::Preparation(info.with_context("run_number", self.run_number.to_string()))
    }

    fn refuse_existing(&self) -> Result<(), EnsembleError> {
        for path in [&self.paths.surface, &self.paths.plot] {
            if path.exists() {
                return Err(self.prepare_error(
                    ErrorInfo::new("artifact-exists", "artifact already exists")
                        .with_context("path", path.display().to_string())
                        .with_hint("set overwrite: overwrite to regenerate existing artifacts"),
                ));
            }
        }
        Ok(())
    }

    fn write_artifact(&self, path: &Path, bytes: &[u8]) -> Result<(), EnsembleError> {
        let result = File::create(path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()
        });
        result.map_err(|err| {
            let _ = fs::remove_file(path);
            self.prepare_error(
                ErrorInfo::new("artifact-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    fn generate(
        &self,
        stats: &EnsembleStatistics,
        ctx: &ArtifactContext<'_>,
    ) -> Result<ArtifactDigests, EnsembleError> {
        if ctx.overwrite == OverwritePolicy::Refuse {
            self.refuse_existing()?;
        }
        fs::create_dir_all(&self.paths.run_dir).map_err(|err| {
            self.prepare_error(
                ErrorInfo::new("run-dir", err.to_string())
                    .with_context("path", self.paths.run_dir.display().to_string()),
            )
        })?;

        let surface = ctx
            .surface
            .generate(&self.parameters)
            .map_err(|info| self.prepare_error(info))?;
        let surface_bytes = surface
            .to_dtopo3_bytes()
            .map_err(|info| self.prepare_error(info))?;
        self.write_artifact(&self.paths.surface, &surface_bytes)?;

        let plot_bytes = ctx
            .renderer
            .render(self.run_number, &self.parameters, stats)
            .map_err(|info| self.prepare_error(info))?;
        self.write_artifact(&self.paths.plot, &plot_bytes)?;

        Ok(ArtifactDigests {
            surface: bytes_sha256(&surface_bytes),
            plot: bytes_sha256(&plot_bytes),
        })
    }

    fn remove_partial_artifacts(&self) {
        let _ = fs::remove_file(&self.paths.surface);
        let _ = fs::remove_file(&self.paths.plot);
    }
}

impl RunUnit for RunDescriptor {
    fn run_number(&self) -> RunNumber {
        self.run_number
    }

    fn parameters(&self) -> &ParameterVector {
        &self.parameters
    }

    fn working_dir(&self) -> &Path {
        &self.paths.run_dir
    }

    fn status(&self) -> RunStatus {
        self.status
    }

    /// Writes the surface and the diagnostic plot, then moves to `Prepared`.
    ///
    /// On failure the run stays `Pending` and any artifact written so far is
    /// removed. Existing artifacts are replaced or refused per
    /// [`OverwritePolicy`]; a refusal leaves them untouched.
    fn prepare(
        &mut self,
        stats: &EnsembleStatistics,
        ctx: &ArtifactContext<'_>,
    ) -> Result<ArtifactDigests, EnsembleError> {
        if self.status != RunStatus::Pending {
            return Err(EnsembleError::invalid_transition(
                self.run_number,
                self.status,
                RunStatus::Prepared,
            ));
        }
        match self.generate(stats, ctx) {
            Ok(digests) => {
                debug!(run = %self.run_number, surface = %digests.surface, "run prepared");
                self.digests = Some(digests.clone());
                self.status = RunStatus::Prepared;
                Ok(digests)
            }
            Err(err) => {
                if err.info().code != "artifact-exists" {
                    self.remove_partial_artifacts();
                }
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: RunStatus) -> Result<(), EnsembleError> {
        if !self.status.can_transition_to(next) {
            return Err(EnsembleError::invalid_transition(self.run_number, self.status, next));
        }
        self.status = next;
        Ok(())
    }

    fn fail(&mut self, cause: String) -> Result<(), EnsembleError> {
        self.transition(RunStatus::Failed)?;
        self.failure = Some(cause);
        Ok(())
    }
}
