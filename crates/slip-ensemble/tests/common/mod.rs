#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use slip_ensemble::{
    EnsembleBuilder, FaultGeometry, FigureConfig, GridSpec, SlipPlotRenderer, SubfaultSurface,
};

pub fn coarse_grid() -> GridSpec {
    GridSpec {
        spacing: 0.25,
        padding: 0.5,
    }
}

/// Builder with a coarse surface grid so tests stay fast.
pub fn builder(root: &Path) -> EnsembleBuilder {
    EnsembleBuilder::new(root)
        .with_surface_generator(SubfaultSurface::new(FaultGeometry::default(), coarse_grid()))
        .with_renderer(SlipPlotRenderer::new(
            FaultGeometry::default(),
            FigureConfig::default(),
        ))
}

pub fn log_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read run log")
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn run_dirs(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .expect("read root")
        .map(|entry| entry.expect("entry").path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}
