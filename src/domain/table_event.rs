//! Change notifications emitted by the tag table.
//!
//! Every mutation of the [`super::TagTableView`] publishes a [`TableEvent`]
//! through the [`super::EventBus`]. Whatever renders rows subscribes to
//! the bus instead of reaching into the table.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DeviceId, TagEntry, TagValue};

/// Identifies one flash of one row.
///
/// `epoch` changes on every table rebuild and `generation` on every flash
/// of the row, so a `FlashCleared` that refers to an older flash can be
/// told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlashTarget {
    /// Table epoch the row belongs to.
    pub epoch: u64,
    /// 1-based display index of the row.
    pub index: usize,
    /// Flash generation of the row.
    pub generation: u64,
}

/// Table event emitted after every displayed-state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TableEvent {
    /// The heading changed because a new device was focused.
    TitleChanged {
        /// New heading text.
        title: String,
    },

    /// All rows were replaced by a snapshot.
    Replaced {
        /// New table epoch.
        epoch: u64,
        /// Device focused when the snapshot was installed.
        device: Option<DeviceId>,
        /// Rows in display order.
        rows: Vec<TagEntry>,
        /// Time the snapshot was installed.
        timestamp: DateTime<Utc>,
    },

    /// A row's value was patched by a change event.
    RowChanged {
        /// Table epoch.
        epoch: u64,
        /// 1-based display index.
        index: usize,
        /// Tag name.
        name: String,
        /// New value.
        value: TagValue,
    },

    /// A row started flashing.
    FlashStarted(FlashTarget),

    /// A flash elapsed.
    FlashCleared(FlashTarget),
}

impl TableEvent {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::TitleChanged { .. } => "title_changed",
            Self::Replaced { .. } => "replaced",
            Self::RowChanged { .. } => "row_changed",
            Self::FlashStarted(_) => "flash_started",
            Self::FlashCleared(_) => "flash_cleared",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn row_changed_serializes_with_tag() {
        let event = TableEvent::RowChanged {
            epoch: 1,
            index: 2,
            name: "Speed".to_string(),
            value: TagValue::Integer(12),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"event_type\":\"row_changed\""));
        assert!(json.contains("\"value\":12"));
    }

    #[test]
    fn flash_event_types() {
        let target = FlashTarget {
            epoch: 1,
            index: 1,
            generation: 1,
        };
        assert_eq!(
            TableEvent::FlashStarted(target).event_type_str(),
            "flash_started"
        );
        assert_eq!(
            TableEvent::FlashCleared(target).event_type_str(),
            "flash_cleared"
        );
    }
}
