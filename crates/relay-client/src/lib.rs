//! # relay-client
//!
//! Consumer side of the relay. A [`PollLoop`] fetches the full session
//! snapshot from the ingest service at a fixed cadence, keeps a bounded
//! [`LiveWindow`] for display and, optionally, an unbounded
//! [`SessionHistory`] that is exported as CSV when the loop stops.
//!
//! ```no_run
//! use relay_client::{address::IngestAddress, HttpSnapshotSource, LogRenderer, PollConfig, PollLoop};
//! use relay_core::RelayConfig;
//!
//! # async fn run() -> relay_client::Result<()> {
//! let config = RelayConfig::load().unwrap_or_default();
//! let address = IngestAddress::parse(&config.client.base_url, Default::default())?;
//! let source = HttpSnapshotSource::new(&address, config.client.fetch_timeout)?;
//! let handle = PollLoop::new(source, LogRenderer, PollConfig::from(&config.client)).spawn();
//!
//! tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//! let report = handle.stop().await?;
//! if let Some(history) = report.buffer.history() {
//!     relay_client::export::export_session("activity_data.csv", history)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod buffer;
pub mod error;
pub mod export;
pub mod poll;
pub mod source;

pub use buffer::{ClientBuffer, LiveWindow, RingWindow, SessionHistory};
pub use error::{ClientError, Result};
pub use poll::{
    LinkState, LogRenderer, PollConfig, PollHandle, PollLoop, PollReport, PollStats, Renderer,
    TickOutcome,
};
pub use source::{HttpSnapshotSource, SnapshotSource};
