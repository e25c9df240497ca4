//! Channel layer: wire messages, subscription deltas, and the websocket
//! connection.
//!
//! The persistent channel carries `subscribe`/`unsubscribe` deltas to the
//! telemetry server and `tag_change` notifications back.

pub mod connection;
pub mod messages;
pub mod subscription;

pub use connection::ConnectionChannel;
pub use messages::{ClientMessage, DeviceSelection, InboundEvent};
pub use subscription::{FocusDelta, MessageSink, SubscriptionManager};
