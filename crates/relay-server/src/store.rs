//! Process-wide telemetry accumulator.
//!
//! All mutation and every snapshot copy happen under one `parking_lot::Mutex`,
//! so a reader can never observe `time` and `accel_*` at different lengths.
//! Request rates are low (one small batch every few hundred milliseconds),
//! which makes a single coarse lock sufficient.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::trace;

use relay_core::{AudioSample, MotionSample, SnapshotPayload};

/// Shared handle passed to request handlers.
pub type SharedIngestStore = Arc<IngestStore>;

/// Outcome of appending a group of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendCounts {
    /// Motion samples that passed the monotonicity filter.
    pub motion_accepted: usize,
    /// Motion samples dropped as duplicate or out of order.
    pub motion_stale: usize,
    /// Audio samples appended.
    pub audio_accepted: usize,
}

/// Accumulator of every sample received during the process lifetime.
#[derive(Debug, Default)]
pub struct IngestStore {
    session: Mutex<SnapshotPayload>,
}

impl IngestStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Arc`.
    #[must_use]
    pub fn shared() -> SharedIngestStore {
        Arc::new(Self::new())
    }

    /// Append a motion sample if its timestamp is strictly later than the last
    /// accepted one.
    ///
    /// Returns `false` (and leaves the store untouched) for duplicate or
    /// out-of-order timestamps. Overlapping batches are normal, so this is not
    /// an error.
    pub fn append_motion(&self, time: DateTime<Utc>, ax: f64, ay: f64, az: f64) -> bool {
        let mut session = self.session.lock();
        push_monotonic(&mut session, MotionSample::new(time, ax, ay, az))
    }

    /// Append an audio sample. Audio has no ordering filter.
    pub fn append_audio(&self, time: DateTime<Utc>, level: f64) {
        self.session.lock().push_audio(AudioSample::new(time, level));
    }

    /// Append a batch of samples under a single lock acquisition.
    ///
    /// Motion samples are filtered exactly as in [`append_motion`](Self::append_motion),
    /// in slice order. Untimed audio samples are stamped with `received_at`.
    pub fn extend(
        &self,
        motion: &[MotionSample],
        audio: &[AudioSample],
        received_at: DateTime<Utc>,
    ) -> AppendCounts {
        let mut counts = AppendCounts::default();
        let mut session = self.session.lock();

        for sample in motion {
            if push_monotonic(&mut session, *sample) {
                counts.motion_accepted += 1;
            } else {
                counts.motion_stale += 1;
            }
        }

        for sample in audio {
            session.push_audio(AudioSample::new(sample.time.unwrap_or(received_at), sample.db));
            counts.audio_accepted += 1;
        }

        counts
    }

    /// Consistent copy of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> SnapshotPayload {
        self.session.lock().clone()
    }

    /// Number of stored motion samples.
    #[must_use]
    pub fn motion_len(&self) -> usize {
        self.session.lock().motion_len()
    }

    /// Number of stored audio samples.
    #[must_use]
    pub fn audio_len(&self) -> usize {
        self.session.lock().audio_len()
    }

    /// Motion and audio sample counts read under one lock acquisition.
    #[must_use]
    pub fn lens(&self) -> (usize, usize) {
        let session = self.session.lock();
        (session.motion_len(), session.audio_len())
    }

    /// Timestamp of the most recent accepted motion sample.
    #[must_use]
    pub fn last_motion_time(&self) -> Option<DateTime<Utc>> {
        self.session.lock().time.last().copied()
    }
}

fn push_monotonic(session: &mut SnapshotPayload, sample: MotionSample) -> bool {
    if let Some(last) = session.time.last() {
        if sample.time <= *last {
            trace!(time = %sample.time, last = %last, "Dropping stale motion sample");
            return false;
        }
    }
    session.push_motion(sample);
    true
}
