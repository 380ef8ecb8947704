use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::{ParameterVector, RunNumber};

use crate::builder::Ensemble;
use crate::descriptor::{ArtifactDigests, RunUnit};
use crate::hash::{file_sha256, stable_hash_string};
use crate::serde::{from_json_slice, to_canonical_json_bytes};
use crate::stats::EnsembleStatistics;

/// Manifest entry for a prepared run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRun {
    /// Run number.
    pub run_number: RunNumber,
    /// `run_<n>` prefix.
    pub prefix: String,
    /// Slips the run was derived from.
    pub parameters: ParameterVector,
    /// Run directory.
    pub working_dir: PathBuf,
    /// Deformation surface file.
    pub surface: PathBuf,
    /// Diagnostic plot file.
    pub plot: PathBuf,
    /// Artifact digests recorded at preparation.
    pub digests: Option<ArtifactDigests>,
}

/// Manifest entry for a run that failed preparation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFailure {
    /// Run number.
    pub run_number: RunNumber,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Manifest layout version.
pub const MANIFEST_VERSION: u32 = 1;

/// Where an ensemble came from and what produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProvenance {
    /// SHA-256 of the table (or run log) the runs were read from.
    pub input_sha256: String,
    /// Path the input was read from.
    pub input_path: PathBuf,
    /// [`MANIFEST_VERSION`] at write time.
    pub manifest_version: u32,
    /// RFC 3339 build time; excluded from [`EnsembleManifest::content_hash`].
    pub created_at: String,
    /// Crate name and version of every tool involved.
    pub tools: BTreeMap<String, String>,
}

/// Canonical JSON record of a built ensemble, written next to the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleManifest {
    /// Ensemble name.
    pub name: String,
    /// Executable every run invokes.
    pub executable: String,
    /// Run log backing the ensemble.
    pub run_log: PathBuf,
    /// Rows in the input table.
    pub total_runs: usize,
    /// Statistics the plots were normalized with.
    pub statistics: EnsembleStatistics,
    /// Prepared runs in run-number order.
    pub runs: Vec<ManifestRun>,
    /// Failed runs in run-number order.
    pub failures: Vec<ManifestFailure>,
    /// Input digest and build metadata.
    pub provenance: BuildProvenance,
}

impl EnsembleManifest {
    /// Assembles the manifest; `input` is the table (or run log) the ensemble came from.
    pub fn from_ensemble(
        name: &str,
        executable: &str,
        ensemble: &Ensemble,
        input: &Path,
    ) -> Result<Self, EnsembleError> {
        let runs = ensemble
            .runs
            .iter()
            .map(|run| ManifestRun {
                run_number: run.run_number(),
                prefix: run.prefix(),
                parameters: run.parameters().clone(),
                working_dir: run.working_dir().to_path_buf(),
                surface: run.paths().surface.clone(),
                plot: run.paths().plot.clone(),
                digests: run.digests().cloned(),
            })
            .collect();
        let failures = ensemble
            .failures
            .iter()
            .map(|failure| ManifestFailure {
                run_number: failure.run_number,
                code: failure.error.info().code.clone(),
                message: failure.error.to_string(),
            })
            .collect();
        let mut tools = BTreeMap::new();
        tools.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Ok(Self {
            name: name.to_string(),
            executable: executable.to_string(),
            run_log: ensemble.run_log.clone(),
            total_runs: ensemble.total_runs,
            statistics: (*ensemble.statistics).clone(),
            runs,
            failures,
            provenance: BuildProvenance {
                input_sha256: file_sha256(input)?,
                input_path: input.to_path_buf(),
                manifest_version: MANIFEST_VERSION,
                created_at: Utc::now().to_rfc3339(),
                tools,
            },
        })
    }

    /// Hash of the manifest contents, ignoring the creation timestamp.
    pub fn content_hash(&self) -> Result<String, EnsembleError> {
        let mut stripped = self.clone();
        stripped.provenance.created_at.clear();
        stable_hash_string(&stripped)
    }

    /// Writes canonical JSON to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), EnsembleError> {
        let io_error = |err: std::io::Error| {
            EnsembleError::Io(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, to_canonical_json_bytes(self)?).map_err(io_error)
    }

    /// Reads a manifest written by [`EnsembleManifest::write`].
    pub fn load(path: &Path) -> Result<Self, EnsembleError> {
        let bytes = fs::read(path).map_err(|err| {
            EnsembleError::Io(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        from_json_slice(&bytes)
    }
}
