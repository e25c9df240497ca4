//! Channel message types: subscription deltas out, tag changes in.

use serde::{Deserialize, Serialize};

use crate::domain::{DeviceId, TagChangeEvent};

/// Devices carried by a `subscribe` message.
///
/// A single device goes out as a bare string, which is the form every
/// server accepts; several devices go out as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSelection {
    /// One device.
    One(DeviceId),
    /// Several devices.
    Many(Vec<DeviceId>),
}

impl DeviceSelection {
    /// Returns the selected devices.
    #[must_use]
    pub fn devices(&self) -> &[DeviceId] {
        match self {
            Self::One(device) => std::slice::from_ref(device),
            Self::Many(devices) => devices,
        }
    }
}

/// Client → server delta message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start pushing tag changes of these devices.
    Subscribe(DeviceSelection),
    /// Stop pushing tag changes of these devices.
    Unsubscribe(Vec<DeviceId>),
}

impl ClientMessage {
    /// `subscribe` for a single device.
    #[must_use]
    pub fn subscribe(device: DeviceId) -> Self {
        Self::Subscribe(DeviceSelection::One(device))
    }

    /// `unsubscribe` for a batch of devices.
    #[must_use]
    pub fn unsubscribe(devices: Vec<DeviceId>) -> Self {
        Self::Unsubscribe(devices)
    }

    /// Returns the message kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Subscribe(_) => "subscribe",
            Self::Unsubscribe(_) => "unsubscribe",
        }
    }

    /// Returns the devices the message refers to.
    #[must_use]
    pub fn devices(&self) -> &[DeviceId] {
        match self {
            Self::Subscribe(selection) => selection.devices(),
            Self::Unsubscribe(devices) => devices,
        }
    }
}

/// One item of the inbound event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A `tag_change` envelope.
    TagChange(TagChangeEvent),
    /// A well-formed message of some other shape.
    Ignored,
    /// A message that could not be interpreted.
    Malformed(String),
    /// The channel failed while reading.
    TransportError(String),
    /// The channel closed; no further events follow.
    Closed,
}

/// Interprets one inbound text frame.
///
/// Only the presence of a `tag_change` key is recognized; anything else
/// that is valid JSON is [`InboundEvent::Ignored`].
#[must_use]
pub fn parse_inbound(text: &str) -> InboundEvent {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return InboundEvent::Malformed(format!("invalid JSON: {e}")),
    };

    let Some(change) = value.get("tag_change") else {
        return InboundEvent::Ignored;
    };

    match serde_json::from_value::<TagChangeEvent>(change.clone()) {
        Ok(event) => InboundEvent::TagChange(event),
        Err(e) => InboundEvent::Malformed(format!("tag_change: {e}")),
    }
}
