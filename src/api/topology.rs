//! Topology description over HTTP.

use reqwest::StatusCode;
use url::Url;

use super::snapshot::SnapshotFetcher;
use crate::domain::Topology;
use crate::error::MonitorError;

/// Path of the graph description relative to the server base URL.
pub const TOPOLOGY_PATH: &str = "data.json";

impl SnapshotFetcher {
    /// Builds the topology URL below the base URL path.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if the base URL cannot carry a path.
    pub fn topology_url(&self) -> Result<Url, MonitorError> {
        self.endpoint(&[TOPOLOGY_PATH])
    }

    /// Fetches the graph description from `GET /data.json`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::TopologyUnavailable`] on a non-200 response and
    /// [`MonitorError::Http`] on transport or decode failure.
    pub async fn fetch_topology(&self) -> Result<Topology, MonitorError> {
        let url = self.topology_url()?;
        tracing::debug!(url = %url, "fetching topology");

        let response = self.http().get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(MonitorError::TopologyUnavailable {
                status: status.as_u16(),
            });
        }

        let topology: Topology = response.json().await?;
        tracing::info!(
            nodes = topology.nodes.len(),
            links = topology.links.len(),
            "topology loaded"
        );
        Ok(topology)
    }
}
