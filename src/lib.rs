//! # sensor-relay
//!
//! Relays phone motion and audio telemetry to a local live viewer.
//!
//! A phone app posts batches to the ingest service, which keeps the whole
//! session in memory and serves it as a snapshot. A polling consumer turns
//! those snapshots into a bounded live window plus an unbounded session
//! history that is exported as CSV on exit.
//!
//! ## Crate Structure
//!
//! - **`relay_core`**: samples, the snapshot payload, configuration, logging
//!   and the shared error type.
//! - **`relay_server`**: the ingest store and the axum HTTP service.
//! - **`relay_client`**: the poll loop, live window, session history and CSV
//!   export.
//! - **`app`**: the `serve`, `watch` and `run` flows used by the binary.

pub mod app;

pub use relay_client as client;
pub use relay_core as core;
pub use relay_server as server;

/// Commonly used types.
pub mod prelude {
    pub use relay_client::{
        ClientBuffer, HttpSnapshotSource, LiveWindow, LogRenderer, PollConfig, PollLoop,
        PollReport, Renderer, SessionHistory, SnapshotSource,
    };
    pub use relay_core::{
        AudioSample, HistoryPolicy, MotionSample, RelayConfig, RelayError, RelayResult,
        SnapshotPayload,
    };
    pub use relay_server::{IngestStore, RelayServer, ServerHandle, SharedIngestStore};
}
