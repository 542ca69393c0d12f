//! Synthetic bin records for exercising the dashboard

use rand::Rng;

use crate::record::BinRecord;

/// Generate a random bin id and record.
///
/// The stored fill, status and alert fields are independent of the distance,
/// so generated bins regularly show a stored fill that disagrees with the
/// distance-derived one.
pub fn random_bin<R: Rng>(rng: &mut R, now_ms: i64) -> (String, BinRecord) {
    let bin_id = rng.gen_range(1000..=9999u32).to_string();
    let fill_percentage = rng.gen_range(0..100u32);
    let status = if fill_percentage > 75 {
        "Full"
    } else {
        "Not Full"
    };

    let record = BinRecord {
        alert: Some(rng.gen_bool(0.3)),
        distance_cm: Some(f64::from(rng.gen_range(5..55u32))),
        fill_percentage: Some(f64::from(fill_percentage)),
        status: Some(status.to_string()),
        timestamp: Some(now_ms),
    };
    (bin_id, record)
}
