#![deny(missing_docs)]
#![doc = "Core vocabulary for fault-slip ensembles: run identifiers, parameter vectors, the error taxonomy and deterministic seeding."]

pub mod errors;
pub mod rng;
mod types;

pub use errors::{EnsembleError, ErrorInfo};
pub use rng::{stratified_unit, stream_rng, stream_seed};
pub use types::{ParameterVector, RunNumber};
