//! Client-side subscription manager.
//!
//! Tracks which devices the server is pushing tag changes for and emits
//! the minimal subscribe/unsubscribe delta when the focused device
//! changes.

use std::collections::BTreeSet;

use super::messages::ClientMessage;
use crate::domain::DeviceId;
use crate::error::MonitorError;

/// Destination of outbound delta messages.
///
/// Implemented by [`super::ConnectionChannel`]; tests substitute an
/// in-memory recorder.
pub trait MessageSink {
    /// Hands `message` to the transport without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Transport`] if the channel is gone, or
    /// [`MonitorError::Encode`] if the message cannot be serialized.
    fn send(&mut self, message: ClientMessage) -> Result<(), MonitorError>;
}

/// Result of one [`SubscriptionManager::focus`] call.
#[derive(Debug, Default)]
pub struct FocusDelta {
    /// Devices an `unsubscribe` was sent for.
    pub unsubscribed: Vec<DeviceId>,
    /// Device a `subscribe` was sent for.
    pub subscribed: Option<DeviceId>,
    /// Send failures, in the order they occurred.
    pub failures: Vec<MonitorError>,
}

impl FocusDelta {
    /// Number of messages handed to the sink.
    #[must_use]
    pub fn messages_sent(&self) -> usize {
        usize::from(!self.unsubscribed.is_empty()) + usize::from(self.subscribed.is_some())
    }

    /// Returns `true` if nothing needed to be sent.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.unsubscribed.is_empty() && self.subscribed.is_none() && self.failures.is_empty()
    }
}

/// Manages the set of devices subscribed on one channel.
///
/// The UI keeps at most one device subscribed, but the delta algorithm
/// works for any set size. The set only changes when the corresponding
/// message was accepted by the sink, so a failed send is retried by the
/// next focus.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    devices: BTreeSet<DeviceId>,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `device` the only subscribed device.
    ///
    /// Sends at most one `unsubscribe` (every other subscribed device, as
    /// one batch) followed by at most one `subscribe` (only if `device` is
    /// not already subscribed).
    pub fn focus(&mut self, device: &DeviceId, sink: &mut impl MessageSink) -> FocusDelta {
        let mut delta = FocusDelta::default();

        let stale: Vec<DeviceId> = self
            .devices
            .iter()
            .filter(|d| *d != device)
            .cloned()
            .collect();

        if !stale.is_empty() {
            match sink.send(ClientMessage::unsubscribe(stale.clone())) {
                Ok(()) => {
                    for d in &stale {
                        self.devices.remove(d);
                    }
                    delta.unsubscribed = stale;
                }
                Err(e) => delta.failures.push(e),
            }
        }

        if !self.devices.contains(device) {
            match sink.send(ClientMessage::subscribe(device.clone())) {
                Ok(()) => {
                    self.devices.insert(device.clone());
                    delta.subscribed = Some(device.clone());
                }
                Err(e) => delta.failures.push(e),
            }
        }

        delta
    }

    /// Unsubscribes every device in one batch.
    ///
    /// # Errors
    ///
    /// Returns the sink error; the set is left unchanged in that case.
    pub fn release_all(
        &mut self,
        sink: &mut impl MessageSink,
    ) -> Result<Vec<DeviceId>, MonitorError> {
        if self.devices.is_empty() {
            return Ok(Vec::new());
        }
        let all: Vec<DeviceId> = self.devices.iter().cloned().collect();
        sink.send(ClientMessage::unsubscribe(all.clone()))?;
        self.devices.clear();
        Ok(all)
    }

    /// Returns `true` if `device` is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }

    /// Returns the subscribed devices in name order.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.devices.iter()
    }

    /// Returns the number of subscribed devices.
    #[must_use]
    pub fn count(&self) -> usize {
        self.devices.len()
    }
}
