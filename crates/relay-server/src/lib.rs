//! # relay-server
//!
//! The ingest side of the relay: a thread-safe [`IngestStore`] fed by
//! `POST /data` and read back whole by `GET /data-snapshot`.
//!
//! ```no_run
//! use relay_core::config::RelayConfig;
//! use relay_server::{IngestStore, RelayServer};
//!
//! # async fn run() -> relay_core::RelayResult<()> {
//! let config = RelayConfig::load()?;
//! let store = IngestStore::shared();
//! let server = RelayServer::bind(&config.server.bind_addr(), store, &config.ingest).await?;
//! server.serve_with_shutdown(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await
//! # }
//! ```

pub mod ingest;
pub mod routes;
pub mod server;
pub mod store;

pub use ingest::{EnvelopeError, IngestReport, RecordError, TagRouter};
pub use routes::{create_router, AppState, IngestResponse};
pub use server::{RelayServer, ServerHandle};
pub use store::{IngestStore, SharedIngestStore};
