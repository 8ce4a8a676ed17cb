//! # relay-core
//!
//! Shared building blocks for the sensor relay: the telemetry data model
//! exchanged between the ingest service and its consumers, the error types,
//! the Figment-based configuration and the tracing setup.
//!
//! - **`sample`**: single motion and audio readings.
//! - **`snapshot`**: the full-session `SnapshotPayload` served by the ingest
//!   service, plus its shape validation.
//! - **`config`**: `RelayConfig`, loaded from TOML and `SENSOR_RELAY_*` env vars.
//! - **`logging`**: `tracing-subscriber` initialization.
//! - **`error`**: `RelayError`, the crate-level error enum.

pub mod config;
pub mod error;
pub mod logging;
pub mod sample;
pub mod snapshot;

pub use config::{HistoryPolicy, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use sample::{AudioSample, MotionSample};
pub use snapshot::{ShapeError, SnapshotPayload};
