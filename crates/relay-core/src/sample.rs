//! Individual sensor readings.
//!
//! Motion and audio arrive on independent channels. A tick on one channel says
//! nothing about the other, so the two are never joined by index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Instant the reading was taken.
    pub time: DateTime<Utc>,
    /// Acceleration along X in m/s².
    pub ax: f64,
    /// Acceleration along Y in m/s².
    pub ay: f64,
    /// Acceleration along Z in m/s².
    pub az: f64,
}

impl MotionSample {
    /// Create a new motion sample.
    #[must_use]
    pub fn new(time: DateTime<Utc>, ax: f64, ay: f64, az: f64) -> Self {
        Self { time, ax, ay, az }
    }
}

/// One sound-pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSample {
    /// Instant the reading was taken.
    ///
    /// `None` when the producing service did not stamp its audio channel.
    pub time: Option<DateTime<Utc>>,
    /// Level in dBFS.
    pub db: f64,
}

impl AudioSample {
    /// Create a timestamped audio sample.
    #[must_use]
    pub fn new(time: DateTime<Utc>, db: f64) -> Self {
        Self {
            time: Some(time),
            db,
        }
    }
}

/// Convert a nanosecond Unix timestamp into an absolute instant.
///
/// Returns `None` when the value is outside the range `DateTime<Utc>` can
/// represent.
#[must_use]
pub fn instant_from_nanos(nanos: i64) -> Option<DateTime<Utc>> {
    let secs = nanos.div_euclid(1_000_000_000);
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec)
}
