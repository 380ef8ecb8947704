use serde::{Deserialize, Serialize};
use slip_core::ParameterVector;

/// Closed interval `[min, max]` over finite parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
}

impl ValueRange {
    /// Degenerate range containing a single value.
    pub fn point(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Returns true when `min == max`.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0
    }

    /// Maps `value` onto `[0, 1]` relative to the range.
    ///
    /// A zero-width range maps every value to mid-scale (0.5).
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_degenerate() || !value.is_finite() {
            return 0.5;
        }
        ((value - self.min) / self.width()).clamp(0.0, 1.0)
    }

    fn include(self, value: f64) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    fn union(self, other: Self) -> Self {
        self.include(other.min).include(other.max)
    }
}

/// Aggregate ranges computed once over the whole ensemble.
///
/// Per-run artifacts (the shared colour scale of diagnostic plots) read these
/// values; nothing mutates them after construction. Non-finite components
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnsembleStatistics {
    /// Number of runs the statistics were computed over.
    pub runs: usize,
    /// Range per parameter dimension (`None` when a column has no finite value).
    pub dimensions: Vec<Option<ValueRange>>,
}

impl EnsembleStatistics {
    /// Single pass over all parameter vectors.
    pub fn compute<'a>(rows: impl IntoIterator<Item = &'a ParameterVector>) -> Self {
        let mut runs = 0;
        let mut dimensions: Vec<Option<ValueRange>> = Vec::new();
        for row in rows {
            runs += 1;
            if dimensions.len() < row.dim() {
                dimensions.resize(row.dim(), None);
            }
            for (slot, &value) in dimensions.iter_mut().zip(row.values()) {
                if !value.is_finite() {
                    continue;
                }
                *slot = Some(slot.map_or(ValueRange::point(value), |range| range.include(value)));
            }
        }
        Self { runs, dimensions }
    }

    /// Range of a single dimension.
    pub fn dimension(&self, index: usize) -> Option<ValueRange> {
        self.dimensions.get(index).copied().flatten()
    }

    /// Range across every dimension (the colour scale for slip plots).
    pub fn overall(&self) -> Option<ValueRange> {
        self.dimensions
            .iter()
            .flatten()
            .copied()
            .reduce(ValueRange::union)
    }

    /// Normalizes `value` against [`EnsembleStatistics::overall`].
    pub fn normalize(&self, value: f64) -> f64 {
        self.overall()
            .map(|range| range.normalize(value))
            .unwrap_or(0.5)
    }
}
