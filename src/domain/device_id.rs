//! Type-safe device identifier.
//!
//! [`DeviceId`] is a newtype around the device name the telemetry server
//! uses as its routing key, so device names cannot be confused with tag
//! names or other strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a monitored device (e.g. `"PLC1"`).
///
/// Unique within a session. Used as the subscription target on the
/// channel and as the path segment of the snapshot request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a `DeviceId` from a device name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the device name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
