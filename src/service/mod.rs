//! Service layer: the monitor session that ties subscriptions, snapshots,
//! and the displayed table together.

pub mod session;

pub use session::{MonitorSession, SessionCommand, SessionHandle};
