//! Top-level flows: run the ingest service, watch one, or both in-process.

use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use relay_client::address::{resolve_address, AddressSource, IngestAddress};
use relay_client::export::export_session;
use relay_client::{HttpSnapshotSource, LogRenderer, PollConfig, PollLoop, PollReport};
use relay_core::{RelayConfig, RelayResult};
use relay_server::{IngestStore, RelayServer, SharedIngestStore};
use tracing::{info, warn};

/// Serve the ingest API until `shutdown` resolves.
pub async fn serve<F>(config: &RelayConfig, store: SharedIngestStore, shutdown: F) -> RelayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = RelayServer::bind(&config.server.bind_addr(), store, &config.ingest).await?;
    server.serve_with_shutdown(shutdown).await
}

/// Poll an ingest service until `shutdown` resolves, then export history to
/// `export` if given.
///
/// `url` (from the command line) takes precedence over `client.base_url`. An
/// invalid address is an error; no other service is substituted.
pub async fn watch<F>(
    config: &RelayConfig,
    url: Option<&str>,
    export: Option<&Path>,
    shutdown: F,
) -> Result<PollReport>
where
    F: Future<Output = ()>,
{
    let address = resolve_address(url, Some(&config.client.base_url)).with_context(|| {
        match url {
            Some(url) => format!("invalid --url '{url}'"),
            None => format!("invalid client.base_url '{}'", config.client.base_url),
        }
    })?;
    watch_address(config, &address, export, shutdown).await
}

/// Run the ingest service and a watcher against it in one process.
pub async fn run<F>(config: &RelayConfig, export: Option<&Path>, shutdown: F) -> Result<PollReport>
where
    F: Future<Output = ()>,
{
    let server = RelayServer::bind(
        &config.server.bind_addr(),
        IngestStore::shared(),
        &config.ingest,
    )
    .await
    .context("failed to start ingest service")?;
    let port = server.local_addr()?.port();
    let handle = server.spawn()?;

    let address = IngestAddress::parse(&format!("127.0.0.1:{port}"), AddressSource::Default)?;
    let report = watch_address(config, &address, export, shutdown).await;

    handle.shutdown().await?;
    report
}

async fn watch_address<F>(
    config: &RelayConfig,
    address: &IngestAddress,
    export: Option<&Path>,
    shutdown: F,
) -> Result<PollReport>
where
    F: Future<Output = ()>,
{
    let source = HttpSnapshotSource::new(address, config.client.fetch_timeout)?;
    info!(%address, origin = address.source().label(), "Watching ingest service");

    let handle = PollLoop::new(source, LogRenderer, PollConfig::from(&config.client)).spawn();
    shutdown.await;
    let report = handle.stop().await?;

    if let Some(path) = export {
        match report.buffer.history() {
            Some(history) => {
                export_session(path, history)
                    .with_context(|| format!("failed to export session to {}", path.display()))?;
            }
            None => warn!("Session history is disabled; nothing to export"),
        }
    }

    Ok(report)
}
