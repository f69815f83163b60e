//! Property checks for the running average and anomaly rule

use proptest::prelude::*;
use rcguard_core::{timing::next_average, AnomalyDetector, EdgeTimer};

proptest! {
    #[test]
    fn average_stays_between_previous_and_sample(
        seed in 1u64..10_000,
        samples in prop::collection::vec(0u64..10_000, 1..64),
    ) {
        let mut average = next_average(0, seed);
        prop_assert_eq!(average, seed);

        for elapsed in samples {
            let next = next_average(average, elapsed);
            prop_assert!(next >= average.min(elapsed));
            prop_assert!(next <= average.max(elapsed));
            average = next;
        }
    }

    #[test]
    fn timer_intervals_match_timestamp_gaps(
        gaps in prop::collection::vec(1u64..5_000, 1..64),
    ) {
        let mut timer = EdgeTimer::new(1_000);
        let mut now = 1_000;

        for gap in gaps {
            now += gap;
            prop_assert_eq!(timer.on_edge(now), gap);
            prop_assert_eq!(timer.last_edge(), now);
        }
        prop_assert!(timer.is_seeded());
    }

    #[test]
    fn constant_interval_never_alerts(interval in 1u64..100_000, edges in 1usize..200) {
        let detector = AnomalyDetector::default();
        let mut timer = EdgeTimer::new(0);

        for i in 1..=edges as u64 {
            let elapsed = timer.on_edge(i * interval);
            prop_assert!(!detector.is_anomalous(elapsed, timer.average_ms()));
        }
    }

    #[test]
    fn threshold_is_strict(average in 0u64..1_000_000, threshold in 0u64..1_000) {
        let detector = AnomalyDetector::new(threshold);
        prop_assert!(!detector.is_anomalous(average + threshold, average));
        prop_assert!(detector.is_anomalous(average + threshold + 1, average));
    }
}

#[test]
fn five_interval_reference() {
    let mut timer = EdgeTimer::new(0);
    let mut now = 0;
    for elapsed in [100, 102, 98, 200, 40] {
        now += elapsed;
        timer.on_edge(now);
    }
    assert_eq!(timer.average_ms(), 94);
}
