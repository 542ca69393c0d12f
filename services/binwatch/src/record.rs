//! Bin records as stored in the realtime database

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single bin record as written by the sensor.
///
/// Every field is optional; missing values are defaulted where they are
/// consumed:
/// - `distance_cm` missing reads as 0 (bin appears full)
/// - `fill_percentage` missing reads as 0 in stats and histogram
/// - `status` missing is not counted as full
/// - `alert` missing is not counted as alerting
/// - `timestamp` missing falls back to the bin id parsed as epoch ms
///
/// Fields are read leniently. Numbers may arrive as JSON numbers or numeric
/// strings, flags as booleans, numbers or "true"/"false" strings. A value of
/// any other type reads as missing and never rejects the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinRecord {
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub distance_cm: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_percentage: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub alert: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<i64>,
}

fn number_from(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| number_from(v).map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| number_from(v).map(|f| f.round() as i64)),
        _ => None,
    }))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        _ => None,
    }))
}

impl BinRecord {
    /// Timestamp to display for this record
    pub fn display_timestamp(&self, bin_id: &str) -> Option<i64> {
        self.timestamp.or_else(|| bin_id.parse().ok())
    }

    /// Whether the stored status reads "full", ignoring case
    pub fn stored_full(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("full"))
    }
}

/// The complete set of bins, keyed by bin id
pub type BinCollection = BTreeMap<String, BinRecord>;

/// Parse a raw store payload into a collection.
///
/// `null` is an empty collection. Objects map keys to records. Arrays are
/// how the store represents collections keyed by small integers; each index
/// becomes the bin id and `null` holes are skipped. Every other entry is
/// kept; one that is not an object reads as a record with no fields.
pub fn parse_snapshot(value: Value) -> crate::Result<BinCollection> {
    let entries: Vec<(String, Value)> = match value {
        Value::Null => return Ok(BinCollection::new()),
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            return Err(crate::BinwatchError::Store(format!(
                "Unexpected snapshot payload: {}",
                other
            )))
        }
    };

    let mut collection = BinCollection::new();
    for (id, entry) in entries {
        let record = if entry.is_object() {
            serde_json::from_value::<BinRecord>(entry).unwrap_or_else(|e| {
                tracing::debug!("Reading bin '{}' with defaults: {}", id, e);
                BinRecord::default()
            })
        } else {
            tracing::debug!("Bin '{}' is not an object, reading with defaults", id);
            BinRecord::default()
        };
        collection.insert(id, record);
    }
    Ok(collection)
}
