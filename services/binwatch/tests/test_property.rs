#[cfg(not(miri))] // Skip property tests under miri as they're too slow
use binwatch::fill::{self, ALERT_THRESHOLD, FULL_THRESHOLD};
#[cfg(not(miri))]
use binwatch::record::{BinCollection, BinRecord};
#[cfg(not(miri))]
use binwatch::reducer::{self, AlertKind, TransitionMemory};
#[cfg(not(miri))]
use proptest::prelude::*;

#[cfg(not(miri))]
fn collection(readings: &[(f64, f64)]) -> BinCollection {
    readings
        .iter()
        .enumerate()
        .map(|(i, (distance, stored_fill))| {
            (
                format!("bin-{}", i),
                BinRecord {
                    distance_cm: Some(*distance),
                    fill_percentage: Some(*stored_fill),
                    ..Default::default()
                },
            )
        })
        .collect()
}

#[cfg(not(miri))]
proptest! {
    #[test]
    fn test_fill_never_increases_with_distance(a in 0.0f64..200.0, b in 0.0f64..200.0) {
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(fill::fill_percentage(Some(near)) >= fill::fill_percentage(Some(far)));
    }

    #[test]
    fn test_fill_is_bounded(distance in -500.0f64..500.0) {
        prop_assert!(fill::fill_percentage(Some(distance)) <= 100);
    }

    #[test]
    fn test_distance_past_range_is_empty(distance in 47.0f64..1000.0) {
        prop_assert_eq!(fill::fill_percentage(Some(distance)), 0);
    }

    #[test]
    fn test_distance_within_offset_is_full(distance in -100.0f64..=17.0) {
        prop_assert_eq!(fill::fill_percentage(Some(distance)), 100);
        prop_assert_eq!(fill::adjusted_distance(Some(distance)), 0.0);
    }

    #[test]
    fn test_classification_matches_thresholds(fill in 0u8..=100) {
        let level = fill::classify(fill);
        prop_assert_eq!(level.is_full, fill >= FULL_THRESHOLD);
        prop_assert_eq!(level.is_alert, fill >= ALERT_THRESHOLD);
        // Every alerting bin is also full
        prop_assert!(!level.is_alert || level.is_full);
    }

    #[test]
    fn test_histogram_counts_every_bin(
        readings in prop::collection::vec((0.0f64..60.0, 0.0f64..100.0), 0..40)
    ) {
        let snapshot = collection(&readings);
        prop_assert_eq!(reducer::histogram(&snapshot).total(), snapshot.len());
    }

    #[test]
    fn test_average_stays_in_range(
        readings in prop::collection::vec((0.0f64..60.0, 0.0f64..=100.0), 1..40)
    ) {
        let stats = reducer::aggregate_stats(&collection(&readings));
        prop_assert!((0..=100).contains(&stats.avg_fill_percentage));
        prop_assert_eq!(stats.total_bins, readings.len());
    }

    #[test]
    fn test_replaying_a_snapshot_emits_nothing(
        readings in prop::collection::vec((0.0f64..60.0, 0.0f64..100.0), 0..20)
    ) {
        let snapshot = collection(&readings);
        let first = reducer::reduce(&snapshot, TransitionMemory::new());
        let second = reducer::reduce(&snapshot, first.memory);
        prop_assert!(second.effects.is_empty());
    }

    #[test]
    fn test_first_snapshot_alerts_match_levels(
        readings in prop::collection::vec((0.0f64..60.0, 0.0f64..100.0), 0..20)
    ) {
        let snapshot = collection(&readings);
        let reduction = reducer::reduce(&snapshot, TransitionMemory::new());

        let full = reduction.view.bins.iter().filter(|b| b.is_full).count();
        let alerting = reduction.view.bins.iter().filter(|b| b.is_alert).count();
        let full_effects = reduction.effects.iter().filter(|e| e.kind == AlertKind::Full).count();
        let alert_effects = reduction.effects.iter().filter(|e| e.kind == AlertKind::Alert).count();

        prop_assert_eq!(full_effects, full);
        prop_assert_eq!(alert_effects, alerting);
    }
}
