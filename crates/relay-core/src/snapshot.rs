//! Full-session snapshot exchanged between the ingest service and consumers.
//!
//! The wire shape is a JSON object of parallel arrays:
//!
//! ```text
//! {
//!   "time":    ["2024-05-01T12:00:00.100Z", ...],   motion timestamps
//!   "accel_x": [0.1, ...],
//!   "accel_y": [0.0, ...],
//!   "accel_z": [9.8, ...],
//!   "db":      [-31.5, ...],                         audio levels
//!   "db_time": ["2024-05-01T12:00:00.120Z", ...]     audio timestamps
//! }
//! ```
//!
//! `time`/`accel_*` are index-aligned. `db`/`db_time` are index-aligned with
//! each other only. `db_time` may be absent in payloads from producers that do
//! not stamp audio; it then decodes as empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::{AudioSample, MotionSample};

/// Point-in-time copy of every stored telemetry sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    /// Motion timestamps, strictly increasing.
    pub time: Vec<DateTime<Utc>>,
    /// Acceleration X, aligned with `time`.
    pub accel_x: Vec<f64>,
    /// Acceleration Y, aligned with `time`.
    pub accel_y: Vec<f64>,
    /// Acceleration Z, aligned with `time`.
    pub accel_z: Vec<f64>,
    /// Audio levels in dBFS, independent of `time`.
    pub db: Vec<f64>,
    /// Audio timestamps, aligned with `db`.
    #[serde(default)]
    pub db_time: Vec<DateTime<Utc>>,
}

/// Channel sequences of a snapshot disagree in length.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// The motion sequences are not index-aligned.
    #[error(
        "motion channels differ in length: time={time}, accel_x={accel_x}, accel_y={accel_y}, accel_z={accel_z}"
    )]
    Motion {
        /// Length of `time`.
        time: usize,
        /// Length of `accel_x`.
        accel_x: usize,
        /// Length of `accel_y`.
        accel_y: usize,
        /// Length of `accel_z`.
        accel_z: usize,
    },

    /// `db_time` is present but does not match `db`.
    #[error("audio channels differ in length: db={db}, db_time={db_time}")]
    Audio {
        /// Length of `db`.
        db: usize,
        /// Length of `db_time`.
        db_time: usize,
    },
}

impl SnapshotPayload {
    /// Number of motion samples (length of `time`).
    #[must_use]
    pub fn motion_len(&self) -> usize {
        self.time.len()
    }

    /// Number of audio samples (length of `db`).
    #[must_use]
    pub fn audio_len(&self) -> usize {
        self.db.len()
    }

    /// Returns `true` if no sample of either kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty() && self.db.is_empty()
    }

    /// Check that aligned channels have equal lengths.
    ///
    /// A payload that fails this check must be discarded as a whole.
    pub fn check_shape(&self) -> Result<(), ShapeError> {
        let time = self.time.len();
        if self.accel_x.len() != time || self.accel_y.len() != time || self.accel_z.len() != time {
            return Err(ShapeError::Motion {
                time,
                accel_x: self.accel_x.len(),
                accel_y: self.accel_y.len(),
                accel_z: self.accel_z.len(),
            });
        }

        if !self.db_time.is_empty() && self.db_time.len() != self.db.len() {
            return Err(ShapeError::Audio {
                db: self.db.len(),
                db_time: self.db_time.len(),
            });
        }

        Ok(())
    }

    /// Iterate motion samples in stored order.
    ///
    /// Stops at the shortest motion sequence; call [`check_shape`](Self::check_shape)
    /// first when alignment matters.
    pub fn motion_samples(&self) -> impl Iterator<Item = MotionSample> + '_ {
        self.time
            .iter()
            .zip(&self.accel_x)
            .zip(&self.accel_y)
            .zip(&self.accel_z)
            .map(|(((t, x), y), z)| MotionSample::new(*t, *x, *y, *z))
    }

    /// Iterate audio samples in stored order.
    pub fn audio_samples(&self) -> impl Iterator<Item = AudioSample> + '_ {
        let timed = !self.db_time.is_empty();
        self.db.iter().enumerate().map(move |(i, db)| AudioSample {
            time: if timed { self.db_time.get(i).copied() } else { None },
            db: *db,
        })
    }

    /// Append one motion sample to every motion sequence.
    pub fn push_motion(&mut self, sample: MotionSample) {
        self.time.push(sample.time);
        self.accel_x.push(sample.ax);
        self.accel_y.push(sample.ay);
        self.accel_z.push(sample.az);
    }

    /// Append one audio sample.
    ///
    /// Untimed samples only extend `db`.
    pub fn push_audio(&mut self, sample: AudioSample) {
        self.db.push(sample.db);
        if let Some(t) = sample.time {
            self.db_time.push(t);
        }
    }
}
