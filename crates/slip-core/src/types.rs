use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a run within its ensemble (0-indexed table row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunNumber(u64);

impl RunNumber {
    /// Creates a run number from its raw integer representation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Creates a run number from a table index.
    pub fn from_index(index: usize) -> Self {
        Self(index as u64)
    }

    /// Returns the raw integer representation.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns the run number as a table index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Deterministic, collision-free run prefix (`run_<n>`).
    pub fn prefix(&self) -> String {
        format!("run_{}", self.0)
    }
}

impl fmt::Display for RunNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable ordered sequence of numeric parameters for one run.
///
/// For fault ensembles each component is the slip of one subfault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector(Box<[f64]>);

impl ParameterVector {
    /// Creates a vector from its components.
    pub fn new(values: impl Into<Box<[f64]>>) -> Self {
        Self(values.into())
    }

    /// Number of components (dimensionality).
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// Component slice.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Returns true when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|value| value.is_finite())
    }

    /// Space separated rendering used by run logs and tables.
    ///
    /// Components use the shortest round-trip representation and always
    /// carry a decimal point (`10.0`, not `10`).
    pub fn to_log_fields(&self) -> String {
        self.0
            .iter()
            .map(|value| format!("{value:?}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<f64>> for ParameterVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values.into_boxed_slice())
    }
}

impl AsRef<[f64]> for ParameterVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_fields_keep_decimal_point() {
        let params = ParameterVector::from(vec![10.0, 2.5, 0.1]);
        assert_eq!(params.to_log_fields(), "10.0 2.5 0.1");
    }

    #[test]
    fn prefix_follows_run_number() {
        assert_eq!(RunNumber::from_raw(7).prefix(), "run_7");
    }
}
