//! BDD step definitions for aggregate statistics feature

use binwatch::record::BinRecord;
use cucumber::{given, then};

use crate::world::BinwatchWorld;

#[given(expr = "bin {string} is stored with fill {int}, status {string} and alert {word}")]
fn stored_bin(world: &mut BinwatchWorld, bin_id: String, fill: u32, status: String, alert: String) {
    let alert = match alert.as_str() {
        "true" => true,
        "false" => false,
        other => panic!("Unknown alert flag: {}", other),
    };
    world.snapshot.insert(
        bin_id,
        BinRecord {
            distance_cm: Some(40.0),
            fill_percentage: Some(f64::from(fill)),
            status: Some(status),
            alert: Some(alert),
            timestamp: None,
        },
    );
}

#[given(expr = "bin {string} is stored without any fields")]
fn stored_bare_bin(world: &mut BinwatchWorld, bin_id: String) {
    world.snapshot.insert(bin_id, BinRecord::default());
}

#[then(expr = "the statistics show {int} bins, {int} alerting, {int} full and {int}% average fill")]
fn statistics_show(
    world: &mut BinwatchWorld,
    total: usize,
    alerting: usize,
    full: usize,
    average: i64,
) {
    let stats = world
        .last_reduction
        .as_ref()
        .expect("no snapshot processed")
        .view
        .stats;
    assert_eq!(stats.total_bins, total);
    assert_eq!(stats.alert_bins, alerting);
    assert_eq!(stats.full_bins, full);
    assert_eq!(stats.avg_fill_percentage, average);
}

#[then(expr = "the histogram buckets are {int}, {int}, {int}, {int}")]
fn histogram_buckets(world: &mut BinwatchWorld, a: usize, b: usize, c: usize, d: usize) {
    let histogram = world
        .last_reduction
        .as_ref()
        .expect("no snapshot processed")
        .view
        .histogram;
    assert_eq!(histogram.buckets, [a, b, c, d]);
}
