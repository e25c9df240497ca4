//! Monitor error types.
//!
//! [`MonitorError`] is the central error type for the crate. None of its
//! variants is fatal: callers log them and degrade to stale or missing
//! display data.

use crate::domain::DeviceId;

/// Client-side error enum.
///
/// # Error Kinds
///
/// | Variant               | Source                         | Effect                   |
/// |-----------------------|--------------------------------|--------------------------|
/// | `Request`             | non-200 snapshot response      | table left unchanged     |
/// | `TopologyUnavailable` | non-200 topology response      | any device name accepted |
/// | `Http`                | HTTP transport failure         | table left unchanged     |
/// | `Transport`           | websocket send/receive failure | subscriptions may drift  |
/// | `MalformedEvent`      | inbound message missing fields | message ignored          |
/// | `InvalidUrl`          | bad server or channel URL      | start-up failure         |
/// | `Encode`              | outbound message serialization | message not sent         |
/// | `Config`              | invalid configuration value    | start-up failure         |
/// | `SessionClosed`       | focus after session shutdown   | request dropped          |
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Snapshot request answered with a non-200 status.
    #[error("snapshot request for {device} failed with HTTP {status}")]
    Request {
        /// Device whose snapshot was requested.
        device: DeviceId,
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// Topology request answered with a non-200 status.
    #[error("topology request failed with HTTP {status}")]
    TopologyUnavailable {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// HTTP transport error (connection refused, body decode, etc.).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel send or receive failure.
    #[error("channel transport error: {0}")]
    Transport(String),

    /// Inbound message that could not be interpreted.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Outbound message could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The monitor session is no longer accepting commands.
    #[error("monitor session has stopped")]
    SessionClosed,
}

impl MonitorError {
    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } | Self::TopologyUnavailable { status } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
