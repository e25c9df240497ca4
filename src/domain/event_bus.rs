//! Fan-out of table mutations to presentation bindings.
//!
//! The table and its highlighter both hold a clone of the same
//! [`EventBus`]. A binding that falls behind loses the oldest events and
//! should resynchronize on the next [`TableEvent::Replaced`].

use tokio::sync::broadcast;

use super::TableEvent;

/// Broadcast bus carrying [`TableEvent`]s from the table to its renderers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TableEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per lagging
    /// renderer. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `event` and returns how many renderers will see it.
    ///
    /// With no renderer attached the event is dropped; the table itself
    /// stays authoritative.
    pub fn publish(&self, event: TableEvent) -> usize {
        let kind = event.event_type_str();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event = kind, delivered, "table event published");
        delivered
    }

    /// Attaches a renderer that sees every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn title(text: &str) -> TableEvent {
        TableEvent::TitleChanged {
            title: text.to_string(),
        }
    }

    #[test]
    fn events_without_renderer_are_dropped() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(title("PLC1 Variables")), 0);

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn zero_capacity_still_delivers() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        assert_eq!(bus.publish(title("PLC1 Variables")), 1);

        let Ok(TableEvent::TitleChanged { title }) = rx.try_recv() else {
            panic!("expected title_changed");
        };
        assert_eq!(title, "PLC1 Variables");
    }

    #[test]
    fn lagging_renderer_loses_oldest_events() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for name in ["A", "B", "C"] {
            bus.publish(title(name));
        }

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(1))
        ));
        let Ok(TableEvent::TitleChanged { title }) = rx.try_recv() else {
            panic!("expected title_changed");
        };
        assert_eq!(title, "B");
    }
}
