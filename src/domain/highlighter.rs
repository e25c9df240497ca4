//! Self-expiring change highlight.
//!
//! A flash is pure row-local state: a generation counter and a deadline.
//! [`ChangeHighlighter::flash`] never waits; the revert notification is
//! published from a detached timer task.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use super::{EventBus, FlashTarget, TableEvent};

/// Default highlight duration.
pub const DEFAULT_FLASH_DURATION: Duration = Duration::from_millis(100);

/// Highlight state stored inside a single row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlashState {
    generation: u64,
    until: Option<Instant>,
}

impl FlashState {
    /// Returns `true` while the most recent flash has not elapsed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.until.is_some_and(|until| Instant::now() < until)
    }

    /// Number of flashes this row has received.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Marks rows as recently changed for a fixed duration.
///
/// Overlapping flashes on the same row restart the duration instead of
/// stacking.
#[derive(Debug, Clone)]
pub struct ChangeHighlighter {
    duration: Duration,
    bus: EventBus,
}

impl ChangeHighlighter {
    /// Creates a highlighter publishing flash notifications on `bus`.
    #[must_use]
    pub fn new(duration: Duration, bus: EventBus) -> Self {
        Self { duration, bus }
    }

    /// Flashes the row at `index` of table `epoch`.
    ///
    /// Publishes [`TableEvent::FlashStarted`] immediately and
    /// [`TableEvent::FlashCleared`] once the duration elapses. Outside a
    /// Tokio runtime the state still expires, only the cleared
    /// notification is skipped.
    pub fn flash(&self, epoch: u64, index: usize, state: &mut FlashState) -> FlashTarget {
        if state.is_active() {
            tracing::trace!(epoch, index, "flash restarted before expiry");
        }
        state.generation = state.generation.wrapping_add(1);
        state.until = Some(Instant::now() + self.duration);

        let target = FlashTarget {
            epoch,
            index,
            generation: state.generation,
        };
        let _ = self.bus.publish(TableEvent::FlashStarted(target));

        match Handle::try_current() {
            Ok(handle) => {
                let bus = self.bus.clone();
                let duration = self.duration;
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = bus.publish(TableEvent::FlashCleared(target));
                });
            }
            Err(_) => tracing::trace!(index, "no runtime, flash clears silently"),
        }

        target
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_highlighter() -> (ChangeHighlighter, EventBus) {
        let bus = EventBus::new(16);
        (ChangeHighlighter::new(DEFAULT_FLASH_DURATION, bus.clone()), bus)
    }

    #[tokio::test(start_paused = true)]
    async fn flash_expires_after_duration() {
        let (highlighter, bus) = make_highlighter();
        let mut rx = bus.subscribe();
        let mut state = FlashState::default();

        let target = highlighter.flash(1, 3, &mut state);
        assert!(state.is_active());
        assert_eq!(target.generation, 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!state.is_active());

        let Ok(TableEvent::FlashStarted(started)) = rx.recv().await else {
            panic!("expected flash_started");
        };
        let Ok(TableEvent::FlashCleared(cleared)) = rx.recv().await else {
            panic!("expected flash_cleared");
        };
        assert_eq!(started, cleared);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_flash_resets_duration() {
        let (highlighter, _bus) = make_highlighter();
        let mut state = FlashState::default();

        highlighter.flash(1, 1, &mut state);
        tokio::time::sleep(Duration::from_millis(60)).await;
        highlighter.flash(1, 1, &mut state);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(state.is_active());
        assert_eq!(state.generation(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!state.is_active());
    }

    #[test]
    fn flash_without_runtime_does_not_block() {
        let (highlighter, _bus) = make_highlighter();
        let mut state = FlashState::default();
        highlighter.flash(1, 1, &mut state);
        assert_eq!(state.generation(), 1);
    }
}
