//! Displayed tag table.
//!
//! [`TagTableView`] holds the rows currently shown for the focused device.
//! It is rebuilt wholesale by [`TagTableView::replace`] whenever a snapshot
//! arrives and patched in place by [`TagTableView::apply_change`] for every
//! inbound change notification.

use std::time::Duration;

use chrono::Utc;

use super::highlighter::{ChangeHighlighter, FlashState};
use super::{DeviceId, EventBus, TableEvent, TagChangeEvent, TagEntry, TagValue};

/// One displayed row.
#[derive(Debug, Clone)]
pub struct TagRow {
    index: usize,
    name: String,
    value: TagValue,
    flash: FlashState,
}

impl TagRow {
    /// 1-based display index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> &TagValue {
        &self.value
    }

    /// Number of times this row has been flashed.
    #[must_use]
    pub const fn flash_count(&self) -> u64 {
        self.flash.generation()
    }
}

/// Ordered rows of the focused device, with change notifications.
///
/// Rows are matched by tag name alone: the change protocol does not carry
/// the originating device.
#[derive(Debug)]
pub struct TagTableView {
    title: Option<String>,
    device: Option<DeviceId>,
    rows: Vec<TagRow>,
    epoch: u64,
    highlighter: ChangeHighlighter,
    bus: EventBus,
}

impl TagTableView {
    /// Creates an empty table publishing on `bus`.
    #[must_use]
    pub fn new(bus: EventBus, flash_duration: Duration) -> Self {
        Self {
            title: None,
            device: None,
            rows: Vec::new(),
            epoch: 0,
            highlighter: ChangeHighlighter::new(flash_duration, bus.clone()),
            bus,
        }
    }

    /// Sets the heading for a newly focused device.
    ///
    /// Rows are left untouched until the device's snapshot is installed.
    pub fn set_device(&mut self, device: &DeviceId) {
        let title = format!("{device} Variables");
        self.device = Some(device.clone());
        self.title = Some(title.clone());
        let _ = self.bus.publish(TableEvent::TitleChanged { title });
    }

    /// Discards all rows and installs `entries` in order, indexed from 1.
    ///
    /// Returns the new table epoch.
    pub fn replace(&mut self, entries: Vec<TagEntry>) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.rows = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| TagRow {
                index: i + 1,
                name: entry.name,
                value: entry.value,
                flash: FlashState::default(),
            })
            .collect();

        tracing::debug!(epoch = self.epoch, rows = self.rows.len(), "table replaced");
        let _ = self.bus.publish(TableEvent::Replaced {
            epoch: self.epoch,
            device: self.device.clone(),
            rows: self.entries(),
            timestamp: Utc::now(),
        });
        self.epoch
    }

    /// Patches every row named `change.name` whose value differs.
    ///
    /// Values are compared by canonical string. Each patched row is
    /// flashed. Returns `true` if at least one row changed.
    pub fn apply_change(&mut self, change: &TagChangeEvent) -> bool {
        let mut applied = false;
        for row in &mut self.rows {
            if row.name != change.name || row.value.same_as(&change.value) {
                continue;
            }
            row.value = change.value.clone();
            let _ = self.bus.publish(TableEvent::RowChanged {
                epoch: self.epoch,
                index: row.index,
                name: row.name.clone(),
                value: row.value.clone(),
            });
            self.highlighter.flash(self.epoch, row.index, &mut row.flash);
            applied = true;
        }
        applied
    }

    /// Returns the row at a 1-based display index.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&TagRow> {
        index.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Returns the first row with the given tag name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&TagRow> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Returns all rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[TagRow] {
        &self.rows
    }

    /// Returns the rows as plain entries.
    #[must_use]
    pub fn entries(&self) -> Vec<TagEntry> {
        self.rows
            .iter()
            .map(|row| TagEntry {
                name: row.name.clone(),
                value: row.value.clone(),
            })
            .collect()
    }

    /// Current heading, if a device was ever focused.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Device the heading refers to.
    #[must_use]
    pub const fn device(&self) -> Option<&DeviceId> {
        self.device.as_ref()
    }

    /// Number of snapshots installed so far.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of displayed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows are displayed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
