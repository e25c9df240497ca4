//! # tagwatch
//!
//! Live tag monitoring client for digital twin telemetry servers.
//!
//! The server publishes a topology of PLCs, HMIs, motors, and network
//! gear. This crate keeps one device in focus: it subscribes to that
//! device's tag changes over a persistent websocket, pulls a full snapshot
//! over HTTP, and patches the displayed rows as change notifications
//! arrive, flashing each row that actually changed.
//!
//! ## Architecture
//!
//! ```text
//! Focus requests (user, topology selection)
//!     │
//!     ├── MonitorSession (service/)
//!     │       │
//!     │       ├── SubscriptionManager ──► ConnectionChannel (ws/)
//!     │       ├── SnapshotFetcher (api/)
//!     │       └── TagTableView + ChangeHighlighter (domain/)
//!     │                   │
//!     │                   └── EventBus ──► presentation binding
//!     │
//!     └── Inbound queue ◄── ConnectionChannel reader
//! ```
//!
//! The channel does not reconnect. When it closes the display goes stale
//! until the process is restarted.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
