use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slip_core::errors::{EnsembleError, ErrorInfo};

use crate::descriptor::OverwritePolicy;
use crate::figures::FigureConfig;
use crate::serde::from_yaml_slice;
use crate::surface::{FaultGeometry, GridSpec};

/// Parameter table used when none is given explicitly.
pub const DEFAULT_TABLE: &str = "random_sample.txt";

/// YAML-configurable settings for an ensemble build. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Ensemble name reported to the executor.
    pub name: String,
    /// Simulation executable each run invokes.
    pub executable: String,
    /// On-disk layout below the base output directory.
    pub layout: LayoutConfig,
    /// Behaviour when a run's artifacts already exist.
    pub overwrite: OverwritePolicy,
    /// Worker threads used to prepare runs (0 is treated as 1).
    pub parallelism: usize,
    /// Fault shared by every run.
    pub fault: FaultGeometry,
    /// Deformation surface grid.
    pub grid: GridSpec,
    /// Diagnostic plot canvas.
    pub figure: FigureConfig,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            name: "fidelity-test".to_string(),
            executable: "xgeoclaw".to_string(),
            layout: LayoutConfig::default(),
            overwrite: OverwritePolicy::default(),
            parallelism: 1,
            fault: FaultGeometry::default(),
            grid: GridSpec::default(),
            figure: FigureConfig::default(),
        }
    }
}

/// File names and directories of an ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Ensemble root relative to the base output directory.
    pub subdir: PathBuf,
    /// Run log file name inside the ensemble root.
    pub run_log: String,
    /// Manifest file name inside the ensemble root.
    pub manifest: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            subdir: PathBuf::from("tohoku").join("okada-fault-random"),
            run_log: "run_log.txt".to_string(),
            manifest: "ensemble.json".to_string(),
        }
    }
}

impl EnsembleConfig {
    /// Loads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, EnsembleError> {
        let bytes = fs::read(path).map_err(|err| {
            EnsembleError::Io(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        from_yaml_slice(&bytes)
    }

    /// Ensemble root for a base output directory.
    pub fn ensemble_root(&self, base: &Path) -> PathBuf {
        base.join(&self.layout.subdir)
    }

    /// Run log location for a base output directory.
    pub fn run_log_path(&self, base: &Path) -> PathBuf {
        self.ensemble_root(base).join(&self.layout.run_log)
    }

    /// Manifest location for a base output directory.
    pub fn manifest_path(&self, base: &Path) -> PathBuf {
        self.ensemble_root(base).join(&self.layout.manifest)
    }
}
