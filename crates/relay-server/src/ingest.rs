//! Telemetry batch decoding.
//!
//! A batch is `{"payload": [record, ...]}`. Each record looks like
//!
//! ```json
//! {"name": "wrist motion", "time": 1714564800123456789,
//!  "values": {"accelerationX": 0.1, "accelerationY": -0.2, "accelerationZ": 9.7}}
//! ```
//!
//! or, for audio, `{"name": "microphone", "time": ..., "values": {"dBFS": -31.4}}`.
//!
//! Failures are split in two tiers. An undecodable envelope rejects the whole
//! request before any record is read ([`EnvelopeError`]). A bad record is
//! dropped on its own and logged ([`RecordError`]); the rest of the batch still
//! lands in the store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use relay_core::config::IngestConfig;
use relay_core::sample::instant_from_nanos;
use relay_core::{AudioSample, MotionSample};

use crate::store::IngestStore;

/// The request body cannot be treated as a telemetry batch.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Body is not JSON.
    #[error("Invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Top-level `payload` field is absent.
    #[error("Payload not found")]
    MissingPayload,

    /// `payload` exists but is not an array.
    #[error("Payload must be an array")]
    PayloadNotArray,
}

/// A single record could not be converted into a sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// A required field is absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field is present but not a number.
    #[error("field '{0}' is not a number")]
    NotNumeric(&'static str),

    /// The nanosecond timestamp cannot be represented as an instant.
    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(String),
}

/// Channel a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Accelerometer record.
    Motion,
    /// Microphone record.
    Audio,
}

/// Maps record `name` tags to channels.
#[derive(Debug, Clone)]
pub struct TagRouter {
    motion: HashSet<String>,
    audio: HashSet<String>,
}

impl TagRouter {
    /// Build a router from the ingest configuration.
    #[must_use]
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            motion: config.motion_tags.iter().cloned().collect(),
            audio: config.audio_tags.iter().cloned().collect(),
        }
    }

    /// Channel for a tag, or `None` if the tag is not recognized.
    #[must_use]
    pub fn classify(&self, name: &str) -> Option<RecordKind> {
        if self.motion.contains(name) {
            Some(RecordKind::Motion)
        } else if self.audio.contains(name) {
            Some(RecordKind::Audio)
        } else {
            None
        }
    }
}

impl Default for TagRouter {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

/// What happened to one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records in the payload.
    pub records: usize,
    /// Motion samples appended.
    pub motion_accepted: usize,
    /// Motion samples rejected by the monotonicity filter.
    pub motion_stale: usize,
    /// Audio samples appended.
    pub audio_accepted: usize,
    /// Recognized records dropped because a field was missing or invalid.
    pub dropped: usize,
    /// Records with an unknown or missing tag.
    pub ignored: usize,
}

/// Decode the envelope and return the raw records.
pub fn parse_envelope(body: &[u8]) -> Result<Vec<Value>, EnvelopeError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(mut envelope) = value else {
        return Err(EnvelopeError::MissingPayload);
    };
    match envelope.remove("payload") {
        Some(Value::Array(records)) => Ok(records),
        Some(_) => Err(EnvelopeError::PayloadNotArray),
        None => Err(EnvelopeError::MissingPayload),
    }
}

/// Convert a motion record into a sample.
pub fn parse_motion(record: &Value) -> Result<MotionSample, RecordError> {
    let time = parse_time(record)?;
    let values = record
        .get("values")
        .ok_or(RecordError::MissingField("values"))?;
    Ok(MotionSample::new(
        time,
        number(values, "accelerationX")?,
        number(values, "accelerationY")?,
        number(values, "accelerationZ")?,
    ))
}

/// Convert an audio record into a sample.
///
/// The level is required. The timestamp is optional; untimed records come
/// back with `time: None` and are stamped on receipt by the store.
pub fn parse_audio(record: &Value) -> Result<AudioSample, RecordError> {
    let values = record
        .get("values")
        .ok_or(RecordError::MissingField("values"))?;
    let db = number(values, "dBFS")?;
    let time = match record.get("time") {
        None | Some(Value::Null) => None,
        Some(_) => Some(parse_time(record)?),
    };
    Ok(AudioSample { time, db })
}

/// Decode a batch and append its samples to `store`.
///
/// Returns an error only for envelope failures, in which case the store is
/// untouched.
pub fn ingest_batch(
    store: &IngestStore,
    router: &TagRouter,
    body: &[u8],
) -> Result<IngestReport, EnvelopeError> {
    ingest_batch_at(store, router, body, Utc::now())
}

/// [`ingest_batch`] with an explicit receive time.
pub fn ingest_batch_at(
    store: &IngestStore,
    router: &TagRouter,
    body: &[u8],
    received_at: DateTime<Utc>,
) -> Result<IngestReport, EnvelopeError> {
    let records = parse_envelope(body)?;

    let mut report = IngestReport {
        records: records.len(),
        ..Default::default()
    };
    let mut motion = Vec::with_capacity(records.len());
    let mut audio = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let name = record.get("name").and_then(Value::as_str);
        match name.and_then(|n| router.classify(n)) {
            Some(RecordKind::Motion) => match parse_motion(record) {
                Ok(sample) => motion.push(sample),
                Err(e) => {
                    warn!(index, error = %e, "Dropping motion record");
                    report.dropped += 1;
                }
            },
            Some(RecordKind::Audio) => match parse_audio(record) {
                Ok(sample) => audio.push(sample),
                Err(e) => {
                    warn!(index, error = %e, "Dropping audio record");
                    report.dropped += 1;
                }
            },
            None => {
                debug!(index, name = ?name, "Ignoring record with unrecognized tag");
                report.ignored += 1;
            }
        }
    }

    let counts = store.extend(&motion, &audio, received_at);
    report.motion_accepted = counts.motion_accepted;
    report.motion_stale = counts.motion_stale;
    report.audio_accepted = counts.audio_accepted;

    debug!(
        records = report.records,
        motion_accepted = report.motion_accepted,
        motion_stale = report.motion_stale,
        audio_accepted = report.audio_accepted,
        dropped = report.dropped,
        ignored = report.ignored,
        "Telemetry batch ingested"
    );

    Ok(report)
}

fn parse_time(record: &Value) -> Result<DateTime<Utc>, RecordError> {
    let raw = record.get("time").ok_or(RecordError::MissingField("time"))?;

    let nanos = if let Some(n) = raw.as_i64() {
        n
    } else if raw.is_u64() {
        return Err(RecordError::TimestampOutOfRange(raw.to_string()));
    } else if let Some(f) = raw.as_f64() {
        if !f.is_finite() || f >= i64::MAX as f64 || f <= i64::MIN as f64 {
            return Err(RecordError::TimestampOutOfRange(raw.to_string()));
        }
        f as i64
    } else {
        return Err(RecordError::NotNumeric("time"));
    };

    instant_from_nanos(nanos).ok_or_else(|| RecordError::TimestampOutOfRange(raw.to_string()))
}

fn number(values: &Value, field: &'static str) -> Result<f64, RecordError> {
    values
        .get(field)
        .ok_or(RecordError::MissingField(field))?
        .as_f64()
        .ok_or(RecordError::NotNumeric(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    const BASE_NS: i64 = 1_714_564_800_000_000_000;

    fn motion(offset_ns: i64, x: f64) -> Value {
        json!({
            "name": "wrist motion",
            "time": BASE_NS + offset_ns,
            "values": {"accelerationX": x, "accelerationY": 0.0, "accelerationZ": 9.81}
        })
    }

    fn audio(db: f64) -> Value {
        json!({"name": "microphone", "time": BASE_NS, "values": {"dBFS": db}})
    }

    fn body(records: Vec<Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({ "payload": records })).unwrap()
    }

    #[test]
    fn test_envelope_not_json() {
        assert!(matches!(
            parse_envelope(b"{not json"),
            Err(EnvelopeError::Decode(_))
        ));
    }

    #[test]
    fn test_envelope_missing_payload() {
        assert!(matches!(
            parse_envelope(br#"{"records": []}"#),
            Err(EnvelopeError::MissingPayload)
        ));
        assert!(matches!(
            parse_envelope(b"[1, 2]"),
            Err(EnvelopeError::MissingPayload)
        ));
    }

    #[test]
    fn test_envelope_payload_not_array() {
        assert!(matches!(
            parse_envelope(br#"{"payload": {"name": "microphone"}}"#),
            Err(EnvelopeError::PayloadNotArray)
        ));
    }

    #[test]
    fn test_parse_motion_record() {
        let sample = parse_motion(&motion(1_500, 0.25)).unwrap();
        assert_eq!(sample.ax, 0.25);
        assert_eq!(sample.az, 9.81);
        assert_eq!(sample.time.timestamp(), BASE_NS / 1_000_000_000);
        assert_eq!(sample.time.timestamp_subsec_nanos(), 1_500);
    }

    #[test]
    fn test_parse_motion_float_time() {
        let record = json!({
            "name": "wrist motion",
            "time": 1.7145648e18,
            "values": {"accelerationX": 0.0, "accelerationY": 0.0, "accelerationZ": 0.0}
        });
        assert!(parse_motion(&record).is_ok());
    }

    #[test]
    fn test_parse_motion_missing_axis() {
        let record = json!({
            "name": "wrist motion",
            "time": BASE_NS,
            "values": {"accelerationX": 0.0, "accelerationZ": 0.0}
        });
        assert_eq!(
            parse_motion(&record).unwrap_err(),
            RecordError::MissingField("accelerationY")
        );
    }

    #[test]
    fn test_parse_motion_bad_time() {
        let record = json!({"name": "wrist motion", "time": "yesterday", "values": {}});
        assert_eq!(
            parse_motion(&record).unwrap_err(),
            RecordError::NotNumeric("time")
        );

        let record = json!({"name": "wrist motion", "time": u64::MAX, "values": {}});
        assert!(matches!(
            parse_motion(&record).unwrap_err(),
            RecordError::TimestampOutOfRange(_)
        ));
    }

    #[test]
    fn test_parse_audio_without_time() {
        let sample = parse_audio(&json!({"name": "microphone", "values": {"dBFS": -12.0}})).unwrap();
        assert_eq!(sample.db, -12.0);
        assert!(sample.time.is_none());
    }

    #[test]
    fn test_tag_router() {
        let router = TagRouter::default();
        assert_eq!(router.classify("wrist motion"), Some(RecordKind::Motion));
        assert_eq!(router.classify("microphone"), Some(RecordKind::Audio));
        assert_eq!(router.classify("battery"), None);
    }

    #[test]
    #[traced_test]
    fn test_batch_isolates_bad_records() {
        let store = IngestStore::new();
        let mut records = vec![motion(1, 0.1), motion(2, 0.2), motion(3, 0.3)];
        records.push(json!({"name": "wrist motion", "time": BASE_NS + 4}));
        records.push(json!({"name": "wrist motion", "values": {"accelerationX": 1.0}}));
        records.push(json!({"name": "microphone", "time": BASE_NS}));

        let report = ingest_batch(&store, &TagRouter::default(), &body(records)).unwrap();

        assert_eq!(report.motion_accepted, 3);
        assert_eq!(report.dropped, 3);
        assert_eq!(store.motion_len(), 3);
        assert_eq!(store.audio_len(), 0);
        assert!(logs_contain("Dropping motion record"));
        assert!(logs_contain("Dropping audio record"));
    }

    #[test]
    fn test_batch_ignores_unknown_tags() {
        let store = IngestStore::new();
        let records = vec![
            json!({"name": "battery", "time": BASE_NS, "values": {"level": 0.9}}),
            json!({"time": BASE_NS}),
            audio(-30.0),
        ];

        let report = ingest_batch(&store, &TagRouter::default(), &body(records)).unwrap();
        assert_eq!(report.ignored, 2);
        assert_eq!(report.audio_accepted, 1);
        assert_eq!(store.snapshot().db, vec![-30.0]);
    }

    #[test]
    fn test_rejected_envelope_leaves_store_untouched() {
        let store = IngestStore::new();
        store.append_motion(instant_from_nanos(BASE_NS).unwrap(), 0.0, 0.0, 0.0);
        let before = store.snapshot();

        assert!(ingest_batch(&store, &TagRouter::default(), br#"{"data": []}"#).is_err());
        assert!(ingest_batch(&store, &TagRouter::default(), b"\x00\x01").is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_overlapping_batches_deduplicate() {
        let store = IngestStore::new();
        let router = TagRouter::default();

        ingest_batch(&store, &router, &body(vec![motion(1, 0.1), motion(2, 0.2)])).unwrap();
        let report =
            ingest_batch(&store, &router, &body(vec![motion(2, 0.2), motion(3, 0.3)])).unwrap();

        assert_eq!(report.motion_accepted, 1);
        assert_eq!(report.motion_stale, 1);
        assert_eq!(store.snapshot().accel_x, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_untimed_audio_stamped_on_receipt() {
        let store = IngestStore::new();
        let received = instant_from_nanos(BASE_NS + 42).unwrap();
        let records = vec![json!({"name": "microphone", "values": {"dBFS": -5.0}})];

        ingest_batch_at(&store, &TagRouter::default(), &body(records), received).unwrap();
        assert_eq!(store.snapshot().db_time, vec![received]);
    }
}
