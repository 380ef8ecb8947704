use serde::{Deserialize, Serialize};
use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::rng::{stratified_unit, stream_rng};

use crate::stats::ValueRange;
use crate::table::ParameterTable;

/// Latin hypercube sampling request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSpec {
    /// Number of runs (rows) to draw.
    pub runs: usize,
    /// Sampling interval for each parameter dimension.
    pub ranges: Vec<ValueRange>,
    /// Master seed; dimension `d` draws from substream `d`.
    pub seed: u64,
}

impl SampleSpec {
    /// Slip interval used when none is given (metres).
    pub const DEFAULT_RANGE: ValueRange = ValueRange {
        min: 0.0,
        max: 120.0,
    };
}

/// Draws a jittered Latin hypercube sample over `spec.ranges`.
///
/// Each dimension is split into `runs` equal strata; every stratum receives
/// exactly one value. The same request always yields the same table.
pub fn latin_hypercube(spec: &SampleSpec) -> Result<ParameterTable, EnsembleError> {
    if spec.runs == 0 {
        return Ok(ParameterTable::default());
    }
    if spec.ranges.is_empty() {
        return Err(EnsembleError::MalformedTable(ErrorInfo::new(
            "sample-dimension",
            "at least one parameter range is required",
        )));
    }
    let mut rows = vec![Vec::with_capacity(spec.ranges.len()); spec.runs];
    for (dim, range) in spec.ranges.iter().enumerate() {
        if !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max) {
            return Err(EnsembleError::MalformedTable(
                ErrorInfo::new("sample-range", "sampling range must be finite with min <= max")
                    .with_context("dimension", dim.to_string())
                    .with_context("min", range.min.to_string())
                    .with_context("max", range.max.to_string()),
            ));
        }
        let slots = stratified_unit(&mut stream_rng(spec.seed, dim as u64), spec.runs);
        for (row, frac) in rows.iter_mut().zip(slots) {
            row.push(range.min + frac * range.width());
        }
    }
    ParameterTable::from_rows(rows)
}
