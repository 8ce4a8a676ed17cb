//! Ingest service lifecycle: bind, serve, shut down.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use relay_core::config::IngestConfig;
use relay_core::RelayResult;

use crate::ingest::TagRouter;
use crate::routes::{create_router, AppState};
use crate::store::SharedIngestStore;

/// A bound, not yet serving, ingest service.
pub struct RelayServer {
    listener: TcpListener,
    state: AppState,
}

impl RelayServer {
    /// Bind the listening socket.
    ///
    /// Use port 0 to let the OS choose; [`local_addr`](Self::local_addr)
    /// reports the result.
    pub async fn bind(
        addr: &str,
        store: SharedIngestStore,
        ingest: &IngestConfig,
    ) -> RelayResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            state: AppState::new(store, TagRouter::from_config(ingest)),
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> RelayResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The store this server writes into.
    #[must_use]
    pub fn store(&self) -> &SharedIngestStore {
        &self.state.store
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> RelayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(%addr, "Ingest service listening");

        axum::serve(self.listener, create_router(self.state))
            .with_graceful_shutdown(signal)
            .await?;

        info!(%addr, "Ingest service stopped");
        Ok(())
    }

    /// Serve on a background task.
    pub fn spawn(self) -> RelayResult<ServerHandle> {
        let addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.serve_with_shutdown(async move {
            let _ = shutdown_rx.await;
        }));
        Ok(ServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

/// Handle to a server running on a background task.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<RelayResult<()>>,
}

impl ServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for clients on this host.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn shutdown(mut self) -> RelayResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e).into()),
        }
    }
}
