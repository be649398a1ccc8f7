use ppg_bpm::{EstimatorConfig, HeartRateEstimator};
use proptest::prelude::*;

fn signal() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1.0f32..1.0, 0..1500)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn warm_up_never_estimates(
        sample_rate in 20.0f64..200.0,
        window_seconds in 1.0f64..8.0,
        seed in any::<u64>()
    ) {
        let mut est = HeartRateEstimator::new(EstimatorConfig::new(sample_rate, window_seconds)).unwrap();
        let n = est.window_size() - 1;
        for i in 0..n {
            let value = (((i as u64).wrapping_mul(seed | 1) >> 7) % 1000) as f32 / 1000.0;
            prop_assert_eq!(est.add_sample(value), None);
        }
    }

    #[test]
    fn smoothed_bpm_stays_in_range(samples in signal()) {
        let mut est = HeartRateEstimator::new(EstimatorConfig::new(50.0, 3.0)).unwrap();
        for value in samples {
            if let Some(bpm) = est.add_sample(value) {
                prop_assert!((30.0..=200.0).contains(&bpm));
            }
            prop_assert!(est.buffered_samples() <= est.window_size());
        }
    }

    #[test]
    fn peaks_are_increasing_and_spaced(samples in signal()) {
        let mut est = HeartRateEstimator::new(EstimatorConfig::new(50.0, 3.0)).unwrap();
        for value in samples {
            est.add_sample(value);
        }
        let indices: Vec<u64> = est.peaks().map(|p| p.sample_index).collect();
        for pair in indices.windows(2) {
            prop_assert!(pair[1] > pair[0]);
            prop_assert!(pair[1] - pair[0] >= 15);
        }
    }

    #[test]
    fn reset_matches_fresh_instance(before in signal(), after in signal()) {
        let config = EstimatorConfig::new(50.0, 3.0);
        let mut used = HeartRateEstimator::new(config.clone()).unwrap();
        for value in before {
            used.add_sample(value);
        }
        used.reset();

        let mut fresh = HeartRateEstimator::new(config).unwrap();
        for value in after {
            prop_assert_eq!(used.add_sample(value), fresh.add_sample(value));
        }
        prop_assert_eq!(used.bpm(), fresh.bpm());
        prop_assert_eq!(used.last_raw_bpm(), fresh.last_raw_bpm());
    }
}
