//! BDD step definitions for threshold transition feature

use binwatch::fill;
use binwatch::record::BinRecord;
use binwatch::reducer::{self, AlertKind};
use cucumber::{given, then, when};

use crate::world::BinwatchWorld;

fn parse_kind(s: &str) -> AlertKind {
    match s {
        "full" => AlertKind::Full,
        "alert" => AlertKind::Alert,
        other => panic!("Unknown alert kind: {}", other),
    }
}

/// Sensor distance that reads as exactly `fill` percent
fn distance_for(fill: u8) -> f64 {
    fill::MOUNT_OFFSET_CM + (100.0 - f64::from(fill)) / 100.0 * fill::MAX_DISTANCE_CM
}

#[given("a fresh transition memory")]
fn fresh_memory(world: &mut BinwatchWorld) {
    world.memory = Default::default();
    world.snapshot.clear();
    world.last_reduction = None;
}

fn set_fill(world: &mut BinwatchWorld, bin_id: String, fill: u8) {
    world.snapshot.insert(
        bin_id,
        BinRecord {
            distance_cm: Some(distance_for(fill)),
            ..Default::default()
        },
    );
}

#[given(expr = "bin {string} reads {int}% full")]
fn bin_reads_fill(world: &mut BinwatchWorld, bin_id: String, fill: u8) {
    set_fill(world, bin_id, fill);
}

#[when(expr = "bin {string} changes to {int}% full")]
fn bin_changes_fill(world: &mut BinwatchWorld, bin_id: String, fill: u8) {
    set_fill(world, bin_id, fill);
}

#[given(expr = "bin {string} reports a distance of {float} cm")]
fn bin_reports_distance(world: &mut BinwatchWorld, bin_id: String, distance: f64) {
    world.snapshot.insert(
        bin_id,
        BinRecord {
            distance_cm: Some(distance),
            ..Default::default()
        },
    );
}

#[given(expr = "bin {string} has no distance reading")]
fn bin_without_distance(world: &mut BinwatchWorld, bin_id: String) {
    world.snapshot.insert(bin_id, BinRecord::default());
}

#[when(expr = "bin {string} is removed from the collection")]
fn bin_removed(world: &mut BinwatchWorld, bin_id: String) {
    world.snapshot.remove(&bin_id);
}

#[when("the collection is emptied")]
fn collection_emptied(world: &mut BinwatchWorld) {
    world.snapshot.clear();
}

fn process(world: &mut BinwatchWorld) {
    let memory = std::mem::take(&mut world.memory);
    let reduction = reducer::reduce(&world.snapshot, memory);
    world.memory = reduction.memory.clone();
    world.last_reduction = Some(reduction);
}

#[given("the snapshot has been processed")]
fn snapshot_already_processed(world: &mut BinwatchWorld) {
    process(world);
}

#[when("the snapshot is processed")]
fn snapshot_processed(world: &mut BinwatchWorld) {
    process(world);
}

#[then(expr = "a {string} alert is queued for bin {string}")]
fn alert_queued(world: &mut BinwatchWorld, kind: String, bin_id: String) {
    let kind = parse_kind(&kind);
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    assert!(
        reduction
            .effects
            .iter()
            .any(|e| e.kind == kind && e.bin_id == bin_id),
        "expected {} alert for {}, got {:?}",
        kind,
        bin_id,
        reduction.effects
    );
}

#[then(expr = "no {string} alert is queued for bin {string}")]
fn alert_not_queued(world: &mut BinwatchWorld, kind: String, bin_id: String) {
    let kind = parse_kind(&kind);
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    assert!(!reduction
        .effects
        .iter()
        .any(|e| e.kind == kind && e.bin_id == bin_id));
}

#[then(expr = "{int} alert(s) queued in total")]
fn alert_count(world: &mut BinwatchWorld, count: usize) {
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    assert_eq!(reduction.effects.len(), count, "{:?}", reduction.effects);
}

#[then("no alerts are queued")]
fn no_alerts(world: &mut BinwatchWorld) {
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    assert!(reduction.effects.is_empty(), "{:?}", reduction.effects);
}

#[then(expr = "bin {string} is shown at {int}% with status {string}")]
fn bin_shown(world: &mut BinwatchWorld, bin_id: String, fill: u8, status: String) {
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    let bin = reduction
        .view
        .bins
        .iter()
        .find(|b| b.id == bin_id)
        .expect("bin not in view");
    assert_eq!(bin.fill_percentage, fill);
    assert_eq!(bin.status.to_string(), status);
}

#[then(expr = "bin {string} has status class {string}")]
fn bin_status_class(world: &mut BinwatchWorld, bin_id: String, class: String) {
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    let bin = reduction
        .view
        .bins
        .iter()
        .find(|b| b.id == bin_id)
        .expect("bin not in view");
    assert_eq!(bin.status_class, class);
}

#[then("the view is empty")]
fn view_is_empty(world: &mut BinwatchWorld) {
    let reduction = world.last_reduction.as_ref().expect("no snapshot processed");
    assert!(reduction.view.empty);
    assert!(reduction.view.bins.is_empty());
    assert_eq!(reduction.view.stats.total_bins, 0);
}
