use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between the Unix epoch and the instrument epoch (1993-01-01).
pub const INSTRUMENT_EPOCH_OFFSET: i64 = 725_846_400;

/// A single surviving value of the inspected channel and where it was seen.
///
/// `timestamp` is empty when the footprint carried no usable time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub timestamp: Option<DateTime<Utc>>,
    pub lat: f64,
    pub lon: f64,
    pub value: f32,
}

/// Converts an instrument timestamp (seconds since 1993-01-01) to UTC.
pub fn instrument_time(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp(seconds as i64 + INSTRUMENT_EPOCH_OFFSET, 0)
}
