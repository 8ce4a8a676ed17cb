//! Where snapshots come from.
//!
//! The poll loop is generic over [`SnapshotSource`] so tests can drive it
//! with scripted payloads instead of a live ingest service.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::SnapshotPayload;
use tracing::debug;
use url::Url;

use crate::address::IngestAddress;
use crate::error::{ClientError, Result};

/// Anything that can produce the current full-session snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the authoritative session snapshot.
    async fn fetch(&self) -> Result<SnapshotPayload>;

    /// Human-readable description for logs.
    fn describe(&self) -> String {
        "snapshot source".to_string()
    }
}

/// Fetches `GET /data-snapshot` from the ingest service.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    http: reqwest::Client,
    url: Url,
}

impl HttpSnapshotSource {
    /// Build a source for `address` with a per-request timeout.
    pub fn new(address: &IngestAddress, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: address.snapshot_url()?,
        })
    }

    /// Snapshot endpoint being polled.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<SnapshotPayload> {
        let response = self.http.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let payload: SnapshotPayload = response.json().await?;
        debug!(
            motion = payload.motion_len(),
            audio = payload.audio_len(),
            "Fetched snapshot"
        );
        Ok(payload)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for std::sync::Arc<S> {
    async fn fetch(&self) -> Result<SnapshotPayload> {
        (**self).fetch().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
