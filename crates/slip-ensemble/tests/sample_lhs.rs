use proptest::prelude::*;
use slip_ensemble::{latin_hypercube, EnsembleError, SampleSpec, ValueRange};

fn spec(runs: usize, dims: usize, seed: u64) -> SampleSpec {
    SampleSpec {
        runs,
        ranges: vec![SampleSpec::DEFAULT_RANGE; dims],
        seed,
    }
}

#[test]
fn same_seed_same_table() {
    let a = latin_hypercube(&spec(16, 3, 7)).expect("sample");
    let b = latin_hypercube(&spec(16, 3, 7)).expect("sample");
    let c = latin_hypercube(&spec(16, 3, 8)).expect("sample");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 16);
    assert_eq!(a.dim(), 3);
}

#[test]
fn zero_runs_is_empty() {
    let table = latin_hypercube(&spec(0, 4, 1)).expect("sample");
    assert!(table.is_empty());
}

#[test]
fn invalid_requests_are_rejected() {
    let err = latin_hypercube(&spec(4, 0, 1)).expect_err("no dimensions");
    assert_eq!(err.info().code, "sample-dimension");

    let inverted = SampleSpec {
        runs: 4,
        ranges: vec![ValueRange {
            min: 5.0,
            max: 1.0,
        }],
        seed: 1,
    };
    let err = latin_hypercube(&inverted).expect_err("inverted range");
    assert!(matches!(err, EnsembleError::MalformedTable(_)));
}

proptest! {
    #[test]
    fn every_stratum_is_hit_once(runs in 1usize..40, seed in any::<u64>()) {
        let table = latin_hypercube(&spec(runs, 2, seed)).expect("sample");
        let range = SampleSpec::DEFAULT_RANGE;
        for dim in 0..2 {
            let mut strata: Vec<usize> = table
                .iter()
                .map(|row| {
                    let frac = (row.values()[dim] - range.min) / range.width();
                    ((frac * runs as f64) as usize).min(runs - 1)
                })
                .collect();
            strata.sort_unstable();
            prop_assert_eq!(strata, (0..runs).collect::<Vec<_>>());
        }
    }
}
