//! Snapshot reducer: raw bin records to dashboard view and alert effects
//!
//! [`reduce`] is pure. It takes the previous [`TransitionMemory`] by value
//! and hands back the updated memory together with the view and any alerts
//! the snapshot triggered, so the caller owns all state between snapshots.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fill::{self, BinStatus};
use crate::record::BinCollection;

/// Last observed threshold flags for one bin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinMemory {
    pub was_full: bool,
    pub was_alert: bool,
}

/// Per-bin flags from the previous snapshot, used for edge detection.
///
/// Entries are never removed: a bin that disappears keeps its last flags
/// and resumes from them if the same id shows up again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionMemory {
    bins: HashMap<String, BinMemory>,
}

impl TransitionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembered flags for a bin; unseen bins are neither full nor alerting
    pub fn get(&self, bin_id: &str) -> BinMemory {
        self.bins.get(bin_id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Which threshold a bin crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Full,
    Alert,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Full => write!(f, "full"),
            AlertKind::Alert => write!(f, "alert"),
        }
    }
}

/// An outbound notification queued by a false-to-true threshold edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEffect {
    pub bin_id: String,
    pub fill_percentage: u8,
    pub kind: AlertKind,
}

/// Derived display state for one bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinView {
    pub id: String,
    pub fill_percentage: u8,
    pub adjusted_distance_cm: f64,
    pub status: BinStatus,
    pub is_full: bool,
    pub is_alert: bool,
    pub status_class: String,
    pub timestamp_epoch_ms: Option<i64>,
    /// Stored `fill_percentage` disagrees with the distance-derived value.
    /// Stats and histogram use the stored value, cards the derived one.
    pub stored_fill_mismatch: bool,
}

/// Aggregate tiles shown above the cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_bins: usize,
    pub alert_bins: usize,
    pub full_bins: usize,
    /// Rounded mean of the stored fills; negative stored values are kept
    pub avg_fill_percentage: i64,
}

/// Histogram bucket labels, in bucket order
pub const HISTOGRAM_LABELS: [&str; 4] = ["0-25%", "26-50%", "51-75%", "76-100%"];

/// Bin counts per fill range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub buckets: [usize; 4],
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.buckets.iter().sum()
    }
}

/// Everything the dashboard renders for one snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub bins: Vec<BinView>,
    pub stats: AggregateStats,
    pub histogram: Histogram,
    pub empty: bool,
}

impl DashboardView {
    /// View shown before any data arrives and after a clear
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Default::default()
        }
    }
}

/// Output of a single reducer pass
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub view: DashboardView,
    pub memory: TransitionMemory,
    pub effects: Vec<AlertEffect>,
}

/// Reduce a full snapshot against the previous transition memory.
///
/// Each bin can queue up to two effects per snapshot: one when it first
/// becomes full and one when it first crosses the alert threshold. Memory is
/// overwritten for every bin present in the snapshot.
pub fn reduce(snapshot: &BinCollection, mut memory: TransitionMemory) -> Reduction {
    if snapshot.is_empty() {
        return Reduction {
            view: DashboardView::empty(),
            memory,
            effects: Vec::new(),
        };
    }

    let mut bins = Vec::with_capacity(snapshot.len());
    let mut effects = Vec::new();
    let mut observed = Vec::with_capacity(snapshot.len());

    for (id, record) in snapshot {
        let fill = fill::fill_percentage(record.distance_cm);
        let level = fill::classify(fill);
        let previous = memory.get(id);

        if !previous.was_full && level.is_full {
            effects.push(AlertEffect {
                bin_id: id.clone(),
                fill_percentage: fill,
                kind: AlertKind::Full,
            });
        }
        if !previous.was_alert && level.is_alert {
            effects.push(AlertEffect {
                bin_id: id.clone(),
                fill_percentage: fill,
                kind: AlertKind::Alert,
            });
        }

        observed.push((
            id.clone(),
            BinMemory {
                was_full: level.is_full,
                was_alert: level.is_alert,
            },
        ));

        let stored_fill_mismatch = record
            .fill_percentage
            .is_some_and(|stored| stored != f64::from(fill));

        bins.push(BinView {
            id: id.clone(),
            fill_percentage: fill,
            adjusted_distance_cm: fill::adjusted_distance(record.distance_cm),
            status: level.status(),
            is_full: level.is_full,
            is_alert: level.is_alert,
            status_class: level.status_class().to_string(),
            timestamp_epoch_ms: record.display_timestamp(id),
            stored_fill_mismatch,
        });
    }

    memory.bins.extend(observed);

    Reduction {
        view: DashboardView {
            bins,
            stats: aggregate_stats(snapshot),
            histogram: histogram(snapshot),
            empty: false,
        },
        memory,
        effects,
    }
}

/// Aggregate statistics over the stored record fields
pub fn aggregate_stats(snapshot: &BinCollection) -> AggregateStats {
    let total_bins = snapshot.len();
    if total_bins == 0 {
        return AggregateStats::default();
    }

    let mut alert_bins = 0;
    let mut full_bins = 0;
    let mut total_fill = 0.0;
    for record in snapshot.values() {
        if record.alert.unwrap_or(false) {
            alert_bins += 1;
        }
        if record.stored_full() {
            full_bins += 1;
        }
        total_fill += record.fill_percentage.unwrap_or(0.0);
    }

    AggregateStats {
        total_bins,
        alert_bins,
        full_bins,
        avg_fill_percentage: (total_fill / total_bins as f64).round() as i64,
    }
}

/// Bucket the stored fill percentages into the four histogram ranges
pub fn histogram(snapshot: &BinCollection) -> Histogram {
    let mut buckets = [0usize; 4];
    for record in snapshot.values() {
        let fill = record.fill_percentage.unwrap_or(0.0);
        let index = if fill <= 25.0 {
            0
        } else if fill <= 50.0 {
            1
        } else if fill <= 75.0 {
            2
        } else {
            3
        };
        buckets[index] += 1;
    }
    Histogram { buckets }
}
