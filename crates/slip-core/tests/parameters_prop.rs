use proptest::prelude::*;
use slip_core::{ParameterVector, RunNumber};

proptest! {
    #[test]
    fn log_fields_parse_back_exactly(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..8)) {
        let params = ParameterVector::from(values.clone());
        let parsed: Vec<f64> = params
            .to_log_fields()
            .split(' ')
            .map(|field| field.parse::<f64>().expect("field parses"))
            .collect();
        prop_assert_eq!(parsed, values);
    }

    #[test]
    fn prefixes_are_unique(a in 0u64..100_000, b in 0u64..100_000) {
        prop_assume!(a != b);
        prop_assert_ne!(RunNumber::from_raw(a).prefix(), RunNumber::from_raw(b).prefix());
    }
}
