//! Consumer-side buffers.
//!
//! Two views over what the ingest service has accepted:
//!
//! - [`LiveWindow`]: the most recent N samples per channel, for display.
//!   Replaced wholesale on every successful poll because each snapshot is the
//!   authoritative server state, not a delta.
//! - [`SessionHistory`]: every sample seen since the consumer started, for
//!   export. Append-only; its length never decreases.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use relay_core::{AudioSample, HistoryPolicy, MotionSample, ShapeError, SnapshotPayload};

/// Fixed-capacity FIFO that evicts the oldest entry on overflow.
#[derive(Debug, Clone)]
pub struct RingWindow<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RingWindow<T> {
    /// Create an empty window. A capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the window holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append one entry, evicting the oldest when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Replace the contents with the last `capacity` entries of `items`.
    pub fn replace<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.items.clear();
        for item in items {
            self.push(item);
        }
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

/// Bounded most-recent view of both channels.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    motion: RingWindow<MotionSample>,
    audio: RingWindow<AudioSample>,
}

impl LiveWindow {
    /// Create an empty window holding up to `capacity` samples per channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            motion: RingWindow::new(capacity),
            audio: RingWindow::new(capacity),
        }
    }

    /// Per-channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.motion.capacity()
    }

    /// Replace both channels with the trailing entries of `payload`.
    ///
    /// Only the tail is walked; the skipped prefix is never copied.
    pub fn replace_from(&mut self, payload: &SnapshotPayload) {
        let skip = payload.motion_len().saturating_sub(self.motion.capacity());
        self.motion.replace(payload.motion_samples().skip(skip));

        let skip = payload.audio_len().saturating_sub(self.audio.capacity());
        self.audio.replace(payload.audio_samples().skip(skip));
    }

    /// Motion samples oldest first.
    #[must_use]
    pub fn motion(&self) -> &RingWindow<MotionSample> {
        &self.motion
    }

    /// Audio samples oldest first.
    #[must_use]
    pub fn audio(&self) -> &RingWindow<AudioSample> {
        &self.audio
    }

    /// Motion timestamps (x axis of the motion plot).
    #[must_use]
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.motion.iter().map(|s| s.time).collect()
    }

    /// Acceleration series as `[x, y, z]`.
    #[must_use]
    pub fn accel_series(&self) -> [Vec<f64>; 3] {
        [
            self.motion.iter().map(|s| s.ax).collect(),
            self.motion.iter().map(|s| s.ay).collect(),
            self.motion.iter().map(|s| s.az).collect(),
        ]
    }

    /// Audio level series.
    #[must_use]
    pub fn db_series(&self) -> Vec<f64> {
        self.audio.iter().map(|s| s.db).collect()
    }
}

/// Samples added to history by one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryDelta {
    /// Motion rows appended.
    pub motion_added: usize,
    /// Audio rows appended.
    pub audio_added: usize,
}

/// Unbounded accumulation of everything seen across polls.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    policy: HistoryPolicy,
    motion: Vec<MotionSample>,
    audio: Vec<AudioSample>,
    /// First motion time of the service session being followed.
    motion_origin: Option<DateTime<Utc>>,
    /// Newest motion time absorbed from that session.
    motion_watermark: Option<DateTime<Utc>>,
    /// First audio time of the service session being followed.
    audio_origin: Option<DateTime<Utc>>,
    /// Server audio entries already absorbed. Audio has no ordering
    /// guarantee, so position in the server's append-only sequence is the
    /// marker; the origins above detect a service restart.
    audio_seen: usize,
}

impl SessionHistory {
    /// Create empty history with the given accumulation policy.
    #[must_use]
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Accumulation policy.
    #[must_use]
    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Fold a validated snapshot into history.
    pub fn absorb(&mut self, payload: &SnapshotPayload) -> HistoryDelta {
        match self.policy {
            HistoryPolicy::FullSnapshot => {
                self.motion.extend(payload.motion_samples());
                self.audio.extend(payload.audio_samples());
                HistoryDelta {
                    motion_added: payload.motion_len(),
                    audio_added: payload.audio_len(),
                }
            }
            HistoryPolicy::Delta => {
                // A different first sample means the service restarted and
                // the snapshot is a new session.
                let first_motion = payload.time.first().copied();
                if self.motion_origin.is_some()
                    && first_motion.is_some()
                    && first_motion != self.motion_origin
                {
                    self.motion_watermark = None;
                }
                if first_motion.is_some() {
                    self.motion_origin = first_motion;
                }

                let before = self.motion.len();
                match self.motion_watermark {
                    Some(last) => self
                        .motion
                        .extend(payload.motion_samples().filter(|s| s.time > last)),
                    None => self.motion.extend(payload.motion_samples()),
                }
                self.motion_watermark = self.motion_watermark.max(payload.time.last().copied());

                let first_audio = payload.db_time.first().copied();
                let audio_restarted = payload.audio_len() < self.audio_seen
                    || (self.audio_origin.is_some()
                        && first_audio.is_some()
                        && first_audio != self.audio_origin);
                if audio_restarted {
                    self.audio_seen = 0;
                }
                if first_audio.is_some() {
                    self.audio_origin = first_audio;
                }
                let audio_added = payload.audio_len() - self.audio_seen;
                self.audio
                    .extend(payload.audio_samples().skip(self.audio_seen));
                self.audio_seen = payload.audio_len();

                HistoryDelta {
                    motion_added: self.motion.len() - before,
                    audio_added,
                }
            }
        }
    }

    /// All motion rows in arrival order.
    #[must_use]
    pub fn motion(&self) -> &[MotionSample] {
        &self.motion
    }

    /// All audio rows in arrival order.
    #[must_use]
    pub fn audio(&self) -> &[AudioSample] {
        &self.audio
    }

    /// Total rows held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.motion.len() + self.audio.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.motion.is_empty() && self.audio.is_empty()
    }
}

/// Result of applying one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Motion samples now in the live window.
    pub motion_in_window: usize,
    /// Audio samples now in the live window.
    pub audio_in_window: usize,
    /// What history gained, if history is enabled.
    pub history: Option<HistoryDelta>,
}

/// Live window plus optional session history.
#[derive(Debug, Clone)]
pub struct ClientBuffer {
    window: LiveWindow,
    history: Option<SessionHistory>,
}

impl ClientBuffer {
    /// Live window only.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            window: LiveWindow::new(capacity),
            history: None,
        }
    }

    /// Live window plus session history.
    #[must_use]
    pub fn with_history(capacity: usize, policy: HistoryPolicy) -> Self {
        Self {
            window: LiveWindow::new(capacity),
            history: Some(SessionHistory::new(policy)),
        }
    }

    /// Validate `payload` and update both views.
    ///
    /// A misaligned payload is rejected before anything is touched.
    pub fn apply(&mut self, payload: &SnapshotPayload) -> Result<ApplyOutcome, ShapeError> {
        payload.check_shape()?;

        self.window.replace_from(payload);
        let history = self.history.as_mut().map(|h| h.absorb(payload));

        Ok(ApplyOutcome {
            motion_in_window: self.window.motion().len(),
            audio_in_window: self.window.audio().len(),
            history,
        })
    }

    /// The live window.
    #[must_use]
    pub fn window(&self) -> &LiveWindow {
        &self.window
    }

    /// Session history, if enabled.
    #[must_use]
    pub fn history(&self) -> Option<&SessionHistory> {
        self.history.as_ref()
    }

    /// Consume the buffer, keeping only the history.
    #[must_use]
    pub fn into_history(self) -> Option<SessionHistory> {
        self.history
    }
}
