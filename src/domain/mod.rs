//! Domain layer: identifiers, tag values, the displayed table, and the
//! device topology.
//!
//! This module contains the client-side model: what a device and a tag
//! are, the table of rows shown for the focused device, the highlight
//! applied to changed rows, and the event bus that reports table
//! mutations to presentation bindings.

pub mod device_id;
pub mod event_bus;
pub mod highlighter;
pub mod tag;
pub mod tag_table;
pub mod table_event;
pub mod topology;

pub use device_id::DeviceId;
pub use event_bus::EventBus;
pub use highlighter::{ChangeHighlighter, FlashState};
pub use tag::{TagChangeEvent, TagEntry, TagValue};
pub use tag_table::{TagRow, TagTableView};
pub use table_event::{FlashTarget, TableEvent};
pub use topology::{DeviceKind, LinkKind, Topology, TopologyNode};
