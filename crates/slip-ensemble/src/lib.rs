#![deny(missing_docs)]
//! Deterministic generation of fault-slip simulation ensembles.
//!
//! A parameter table becomes an ordered set of run descriptors: ensemble-wide
//! statistics are computed once, every run is recorded in a durable run log,
//! and each run's deformation surface and diagnostic plot are generated
//! independently so one bad row never blocks the others.

/// Table to prepared-ensemble pipeline.
pub mod builder;
/// YAML build configuration.
pub mod config;
pub mod descriptor;
/// SVG diagnostics.
pub mod figures;
/// SHA-256 digests of files and canonical values.
pub mod hash;
/// Canonical `ensemble.json` record of a build.
pub mod manifest;
pub mod runlog;
/// Parameter table sampling.
pub mod sample;
/// Canonical JSON and YAML decoding helpers.
pub mod serde;
/// Ensemble-wide parameter statistics.
pub mod stats;
pub mod surface;
/// Parameter tables.
pub mod table;

pub use builder::{BuildReport, Ensemble, EnsembleBuilder, RunFailure};
pub use config::{EnsembleConfig, LayoutConfig, DEFAULT_TABLE};
pub use descriptor::{
    ArtifactContext, ArtifactDigests, OverwritePolicy, RunDescriptor, RunPaths, RunStatus,
    RunUnit,
};
pub use figures::{DiagnosticRenderer, FigureConfig, SlipPlotRenderer};
pub use manifest::{BuildProvenance, EnsembleManifest};
pub use runlog::{read_run_log, RunLog, RunLogEntry};
pub use sample::{latin_hypercube, SampleSpec};
pub use stats::{EnsembleStatistics, ValueRange};
pub use surface::{FaultGeometry, GridSpec, SubfaultSurface, Surface, SurfaceGenerator};
pub use table::{load_table, parse_table, write_table, ParameterTable};

pub use slip_core::{EnsembleError, ErrorInfo, ParameterVector, RunNumber};
