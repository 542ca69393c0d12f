//! Distance-to-fill calibration and threshold classification
//!
//! The ultrasonic sensor is mounted above the bin opening. A reading of
//! [`MOUNT_OFFSET_CM`] or less means the bin is full; a reading of
//! `MOUNT_OFFSET_CM + MAX_DISTANCE_CM` or more means it is empty.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance between the sensor and the top of a full bin
pub const MOUNT_OFFSET_CM: f64 = 17.0;

/// Sensed depth of an empty bin below the mount offset
pub const MAX_DISTANCE_CM: f64 = 30.0;

/// Fill percentage at which a bin counts as full
pub const FULL_THRESHOLD: u8 = 75;

/// Fill percentage at which a bin raises an alert
pub const ALERT_THRESHOLD: u8 = 90;

/// Distance below the mount offset, never negative.
///
/// A missing reading counts as zero.
pub fn adjusted_distance(distance_cm: Option<f64>) -> f64 {
    (distance_cm.unwrap_or(0.0) - MOUNT_OFFSET_CM).max(0.0)
}

/// Fill percentage in `0..=100` derived from a raw sensor distance.
///
/// A missing reading is treated as zero distance, which reports the bin as
/// completely full.
pub fn fill_percentage(distance_cm: Option<f64>) -> u8 {
    let adjusted = adjusted_distance(distance_cm);
    let raw = 100.0 - (adjusted / MAX_DISTANCE_CM * 100.0);
    raw.round().clamp(0.0, 100.0) as u8
}

/// Display status of a bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinStatus {
    #[serde(rename = "Full")]
    Full,
    #[serde(rename = "Not Full")]
    NotFull,
}

impl fmt::Display for BinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinStatus::Full => write!(f, "Full"),
            BinStatus::NotFull => write!(f, "Not Full"),
        }
    }
}

/// Threshold flags for a single fill percentage.
///
/// `is_full` and `is_alert` are evaluated independently against their own
/// thresholds; there is no hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub is_full: bool,
    pub is_alert: bool,
}

impl Level {
    pub fn status(&self) -> BinStatus {
        if self.is_full {
            BinStatus::Full
        } else {
            BinStatus::NotFull
        }
    }

    /// CSS class suffix used by the dashboard cards
    pub fn status_class(&self) -> &'static str {
        if self.is_alert {
            "alert"
        } else if self.is_full {
            "full"
        } else {
            "not-full"
        }
    }
}

/// Classify a fill percentage against the full and alert thresholds
pub fn classify(fill: u8) -> Level {
    Level {
        is_full: fill >= FULL_THRESHOLD,
        is_alert: fill >= ALERT_THRESHOLD,
    }
}
