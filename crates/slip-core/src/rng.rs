//! Seeded randomness for parameter sampling.
//!
//! Every parameter dimension draws from its own stream. A stream's seed is
//! SipHash-1-3 (zero keys) over `(master_seed, stream)`, so adding a
//! dimension leaves the values drawn for existing dimensions unchanged.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;

/// Seed of stream `stream` under `master_seed`.
pub fn stream_seed(master_seed: u64, stream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(stream);
    hasher.finish()
}

/// Generator for stream `stream` under `master_seed`.
pub fn stream_rng(master_seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(stream_seed(master_seed, stream))
}

/// One jittered draw from each of `strata` equal slices of `[0, 1)`, shuffled.
///
/// Value `i` before shuffling lies in `[i / strata, (i + 1) / strata)`.
pub fn stratified_unit<R: Rng + ?Sized>(rng: &mut R, strata: usize) -> Vec<f64> {
    let width = 1.0 / strata.max(1) as f64;
    let mut draws: Vec<f64> = (0..strata)
        .map(|slot| ((slot as f64 + rng.gen::<f64>()) * width).min(1.0 - f64::EPSILON))
        .collect();
    draws.shuffle(rng);
    draws
}
