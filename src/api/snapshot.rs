//! One-shot tag snapshot over HTTP.

use std::future::Future;

use reqwest::StatusCode;
use url::Url;

use crate::domain::{DeviceId, TagEntry};
use crate::error::MonitorError;

/// Source of full tag snapshots.
///
/// Implemented by [`SnapshotFetcher`]; the session only depends on this
/// trait so it can be driven by an in-memory source in tests.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Fetches the current tags of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] if the snapshot could not be obtained.
    fn fetch(
        &self,
        device: &DeviceId,
    ) -> impl Future<Output = Result<Vec<TagEntry>, MonitorError>> + Send;
}

/// HTTP client for `GET /api/v1/{device}`.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    http: reqwest::Client,
    base_url: Url,
}

impl SnapshotFetcher {
    /// Creates a fetcher rooted at `base_url` (e.g. `http://twin.local/`).
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, base_url })
    }

    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Builds the snapshot URL for `device`, escaping the name as one
    /// path segment.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if the base URL cannot carry a path.
    pub fn snapshot_url(&self, device: &DeviceId) -> Result<Url, MonitorError> {
        self.endpoint(&["api", "v1", device.as_str()])
    }

    /// Appends `segments` below the base URL path, whether or not the base
    /// ends with a slash.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, MonitorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| MonitorError::Config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl SnapshotSource for SnapshotFetcher {
    async fn fetch(&self, device: &DeviceId) -> Result<Vec<TagEntry>, MonitorError> {
        let url = self.snapshot_url(device)?;
        tracing::debug!(%device, url = %url, "fetching snapshot");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(MonitorError::Request {
                device: device.clone(),
                status: status.as_u16(),
            });
        }

        let entries: Vec<TagEntry> = response.json().await?;
        tracing::debug!(%device, tags = entries.len(), "snapshot received");
        Ok(entries)
    }
}
