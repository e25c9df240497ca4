//! Monitor session: focus changes, snapshots, and change events.
//!
//! [`MonitorSession`] is the single consumer of three independently timed
//! inputs: focus commands, snapshot completions, and the inbound event
//! queue. Every snapshot request carries a token; a completion whose token
//! is not the latest one issued belongs to a superseded focus and is
//! dropped.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::SnapshotSource;
use crate::domain::{DeviceId, TagEntry, TagTableView};
use crate::error::MonitorError;
use crate::ws::{InboundEvent, MessageSink, SubscriptionManager};

/// Commands accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Monitor `device` from now on.
    Focus(DeviceId),
}

/// Cloneable handle to a running session.
///
/// The session stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Requests monitoring of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionClosed`] if the session has stopped.
    pub async fn focus(&self, device: DeviceId) -> Result<(), MonitorError> {
        self.commands
            .send(SessionCommand::Focus(device))
            .await
            .map_err(|_| MonitorError::SessionClosed)
    }
}

/// Completion of one snapshot request.
#[derive(Debug)]
struct SnapshotReply {
    token: u64,
    device: DeviceId,
    result: Result<Vec<TagEntry>, MonitorError>,
}

/// Owns the subscription state and the displayed table of one client.
#[derive(Debug)]
pub struct MonitorSession<S, K> {
    subscriptions: SubscriptionManager,
    table: TagTableView,
    source: Arc<S>,
    sink: K,
    last_token: u64,
    pending: Option<u64>,
    replies_tx: mpsc::UnboundedSender<SnapshotReply>,
    replies_rx: Option<mpsc::UnboundedReceiver<SnapshotReply>>,
}

impl<S, K> MonitorSession<S, K>
where
    S: SnapshotSource,
    K: MessageSink,
{
    /// Creates a session with no subscriptions.
    #[must_use]
    pub fn new(source: S, sink: K, table: TagTableView) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            subscriptions: SubscriptionManager::new(),
            table,
            source: Arc::new(source),
            sink,
            last_token: 0,
            pending: None,
            replies_tx,
            replies_rx: Some(replies_rx),
        }
    }

    /// Moves focus to `device`.
    ///
    /// Sends the subscription delta first, then requests the snapshot.
    /// Returns the token of the snapshot request.
    pub fn focus(&mut self, device: DeviceId) -> u64 {
        let delta = self.subscriptions.focus(&device, &mut self.sink);
        for failure in &delta.failures {
            tracing::warn!(%device, error = %failure, "delta message not sent");
        }
        if delta.is_noop() {
            tracing::debug!(%device, "already subscribed, refreshing snapshot");
        } else {
            tracing::info!(
                %device,
                unsubscribed = ?delta.unsubscribed,
                subscribed = delta.subscribed.is_some(),
                messages = delta.messages_sent(),
                "focus changed"
            );
        }

        self.table.set_device(&device);

        self.last_token = self.last_token.wrapping_add(1);
        let token = self.last_token;
        self.pending = Some(token);

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(%device, "no runtime, snapshot not requested");
            self.pending = None;
            return token;
        };

        let source = Arc::clone(&self.source);
        let replies = self.replies_tx.clone();
        handle.spawn(async move {
            let result = source.fetch(&device).await;
            let _ = replies.send(SnapshotReply {
                token,
                device,
                result,
            });
        });

        token
    }

    /// Installs a snapshot if it answers the latest focus.
    fn apply_snapshot(&mut self, reply: SnapshotReply) -> bool {
        if self.pending != Some(reply.token) {
            tracing::debug!(
                device = %reply.device,
                token = reply.token,
                "discarding superseded snapshot"
            );
            return false;
        }
        self.pending = None;

        match reply.result {
            Ok(entries) => {
                let rows = entries.len();
                let epoch = self.table.replace(entries);
                tracing::info!(device = %reply.device, epoch, rows, "snapshot applied");
                true
            }
            Err(e) => {
                tracing::warn!(
                    device = %reply.device,
                    status = ?e.status(),
                    error = %e,
                    "snapshot fetch failed, keeping previous table"
                );
                false
            }
        }
    }

    /// Waits for the next snapshot completion and applies it.
    ///
    /// Returns `Some(true)` if the table was replaced, `Some(false)` if the
    /// completion was stale or failed, and `None` once the session loop
    /// has taken over the completion queue.
    pub async fn settle_next(&mut self) -> Option<bool> {
        let reply = self.replies_rx.as_mut()?.recv().await?;
        Some(self.apply_snapshot(reply))
    }

    /// Applies one inbound event. Returns `true` if a row changed.
    pub fn handle_inbound(&mut self, event: InboundEvent) -> bool {
        match event {
            InboundEvent::TagChange(change) => {
                let applied = self.table.apply_change(&change);
                if !applied {
                    tracing::trace!(tag = %change.name, "change matched no row or no new value");
                }
                applied
            }
            InboundEvent::Ignored => {
                tracing::trace!("ignoring non tag_change message");
                false
            }
            InboundEvent::Malformed(reason) => {
                let err = MonitorError::MalformedEvent(reason);
                tracing::debug!(error = %err, "dropping inbound message");
                false
            }
            InboundEvent::TransportError(reason) => {
                let err = MonitorError::Transport(reason);
                tracing::warn!(error = %err, "telemetry channel failed");
                false
            }
            InboundEvent::Closed => {
                tracing::warn!("telemetry channel closed, display will go stale");
                false
            }
        }
    }

    /// Runs the consumer loop until every command sender is dropped.
    ///
    /// On shutdown all remaining subscriptions are released. Returns the
    /// session so its final state can be inspected.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut inbound: mpsc::Receiver<InboundEvent>,
    ) -> Self {
        let Some(mut replies) = self.replies_rx.take() else {
            tracing::error!("session loop already ran");
            return self;
        };
        let mut inbound_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Focus(device)) => {
                        self.focus(device);
                    }
                    None => break,
                },
                Some(reply) = replies.recv() => {
                    self.apply_snapshot(reply);
                }
                event = inbound.recv(), if inbound_open => match event {
                    Some(event) => {
                        inbound_open = event != InboundEvent::Closed;
                        self.handle_inbound(event);
                    }
                    None => inbound_open = false,
                },
            }
        }

        match self.subscriptions.release_all(&mut self.sink) {
            Ok(released) if !released.is_empty() => {
                tracing::info!(?released, "subscriptions released");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "could not release subscriptions"),
        }
        tracing::debug!("monitor session stopped");
        self
    }

    /// Returns the displayed table.
    #[must_use]
    pub const fn table(&self) -> &TagTableView {
        &self.table
    }

    /// Returns the subscription state.
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Returns the message sink.
    #[must_use]
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    /// Consumes the session and returns its message sink, so the caller
    /// can flush and close the transport.
    #[must_use]
    pub fn into_sink(self) -> K {
        self.sink
    }
}

impl<S, K> MonitorSession<S, K>
where
    S: SnapshotSource,
    K: MessageSink + Send + 'static,
{
    /// Spawns [`Self::run`] on the current runtime.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        self,
        inbound: mpsc::Receiver<InboundEvent>,
        command_capacity: usize,
    ) -> (SessionHandle, JoinHandle<Self>) {
        let (commands_tx, commands_rx) = mpsc::channel(command_capacity.max(1));
        let task = tokio::spawn(self.run(commands_rx, inbound));
        (
            SessionHandle {
                commands: commands_tx,
            },
            task,
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::domain::{EventBus, TableEvent, TagChangeEvent, TagValue};
    use crate::ws::ClientMessage;
    use crate::ws::subscription::tests::RecordingSink;

    #[derive(Debug, Default)]
    struct StaticSource {
        tags: HashMap<DeviceId, Vec<TagEntry>>,
    }

    impl StaticSource {
        fn with(mut self, device: &str, entries: Vec<TagEntry>) -> Self {
            self.tags.insert(DeviceId::from(device), entries);
            self
        }
    }

    impl SnapshotSource for StaticSource {
        async fn fetch(&self, device: &DeviceId) -> Result<Vec<TagEntry>, MonitorError> {
            self.tags
                .get(device)
                .cloned()
                .ok_or_else(|| MonitorError::Request {
                    device: device.clone(),
                    status: 404,
                })
        }
    }

    /// Source whose fetches for selected devices resolve late.
    #[derive(Debug)]
    struct DelayedSource {
        inner: StaticSource,
        delays: HashMap<DeviceId, Duration>,
    }

    impl SnapshotSource for DelayedSource {
        async fn fetch(&self, device: &DeviceId) -> Result<Vec<TagEntry>, MonitorError> {
            if let Some(delay) = self.delays.get(device) {
                tokio::time::sleep(*delay).await;
            }
            self.inner.fetch(device).await
        }
    }

    fn make_source() -> StaticSource {
        StaticSource::default()
            .with(
                "PLC1",
                vec![TagEntry::new("Speed", "10"), TagEntry::new("Running", true)],
            )
            .with("Motor1", vec![TagEntry::new("Torque", 3.5)])
    }

    fn make_session(
        source: StaticSource,
    ) -> (MonitorSession<StaticSource, RecordingSink>, EventBus) {
        let bus = EventBus::new(64);
        let table = TagTableView::new(bus.clone(), Duration::from_millis(100));
        (
            MonitorSession::new(source, RecordingSink::default(), table),
            bus,
        )
    }

    fn id(name: &str) -> DeviceId {
        DeviceId::from(name)
    }

    #[tokio::test]
    async fn focus_installs_snapshot() {
        let (mut session, _bus) = make_session(make_source());

        session.focus(id("PLC1"));
        assert_eq!(session.settle_next().await, Some(true));

        assert_eq!(session.table().title(), Some("PLC1 Variables"));
        assert_eq!(
            session.table().entries(),
            vec![TagEntry::new("Speed", "10"), TagEntry::new("Running", true)]
        );
        assert_eq!(
            session.sink().sent,
            vec![ClientMessage::subscribe(id("PLC1"))]
        );
    }

    #[tokio::test]
    async fn superseded_snapshot_is_discarded() {
        let (mut session, _bus) = make_session(make_source());

        let first = session.focus(id("PLC1"));
        let second = session.focus(id("Motor1"));
        assert!(second > first);

        let a = session.settle_next().await;
        let b = session.settle_next().await;
        let applied = [a, b].iter().filter(|r| **r == Some(true)).count();
        assert_eq!(applied, 1);

        assert_eq!(session.table().entries(), vec![TagEntry::new("Torque", 3.5)]);
        assert_eq!(session.table().epoch(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_superseded_snapshot_does_not_overwrite_current() {
        let source = DelayedSource {
            inner: make_source(),
            delays: HashMap::from([(id("PLC1"), Duration::from_millis(50))]),
        };
        let bus = EventBus::new(64);
        let table = TagTableView::new(bus, Duration::from_millis(100));
        let mut session = MonitorSession::new(source, RecordingSink::default(), table);

        session.focus(id("PLC1"));
        session.focus(id("Motor1"));

        assert_eq!(session.settle_next().await, Some(true));
        assert_eq!(session.table().entries(), vec![TagEntry::new("Torque", 3.5)]);

        assert_eq!(session.settle_next().await, Some(false));
        assert_eq!(session.table().entries(), vec![TagEntry::new("Torque", 3.5)]);
        assert_eq!(session.table().title(), Some("Motor1 Variables"));
        assert_eq!(session.table().epoch(), 1);
    }

    #[tokio::test]
    async fn change_before_snapshot_is_dropped_then_overwritten() {
        let (mut session, _bus) = make_session(make_source());

        session.focus(id("PLC1"));
        let early = InboundEvent::TagChange(TagChangeEvent::new("Speed", "99"));
        assert!(!session.handle_inbound(early));

        assert_eq!(session.settle_next().await, Some(true));
        assert_eq!(
            session.table().find("Speed").map(|r| r.value().canonical()),
            Some("10".to_string())
        );

        let late = InboundEvent::TagChange(TagChangeEvent::new("Speed", "12"));
        assert!(session.handle_inbound(late));
        assert_eq!(
            session.table().find("Speed").map(|r| r.value().clone()),
            Some(TagValue::from("12"))
        );
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_table() {
        let (mut session, _bus) = make_session(make_source());

        session.focus(id("PLC1"));
        assert_eq!(session.settle_next().await, Some(true));

        session.focus(id("Unknown"));
        assert_eq!(session.settle_next().await, Some(false));

        assert_eq!(session.table().len(), 2);
        assert_eq!(session.table().title(), Some("Unknown Variables"));
        assert!(session.subscriptions().is_subscribed(&id("Unknown")));
    }

    #[tokio::test]
    async fn non_change_events_are_harmless() {
        let (mut session, _bus) = make_session(make_source());
        session.focus(id("PLC1"));
        session.settle_next().await;

        assert!(!session.handle_inbound(InboundEvent::Ignored));
        assert!(!session.handle_inbound(InboundEvent::Malformed("bad".to_string())));
        assert!(!session.handle_inbound(InboundEvent::TransportError("reset".to_string())));
        assert!(!session.handle_inbound(InboundEvent::Closed));
        assert_eq!(session.table().len(), 2);
    }

    #[tokio::test]
    async fn running_session_applies_changes_and_releases_on_shutdown() {
        let (session, bus) = make_session(make_source());
        let mut events = bus.subscribe();
        let (inbound_tx, inbound_rx) = mpsc::channel(16);

        let (handle, task) = session.start(inbound_rx, 8);
        let Ok(()) = handle.focus(id("PLC1")).await else {
            panic!("focus rejected");
        };

        loop {
            let Ok(event) = events.recv().await else {
                panic!("bus closed");
            };
            if matches!(event, TableEvent::Replaced { .. }) {
                break;
            }
        }

        let change = InboundEvent::TagChange(TagChangeEvent::new("Speed", "11"));
        let Ok(()) = inbound_tx.send(change).await else {
            panic!("inbound closed");
        };
        loop {
            let Ok(event) = events.recv().await else {
                panic!("bus closed");
            };
            if let TableEvent::RowChanged { index, value, .. } = event {
                assert_eq!(index, 1);
                assert_eq!(value.canonical(), "11");
                break;
            }
        }

        drop(handle);
        let Ok(session) = task.await else {
            panic!("session task failed");
        };
        assert_eq!(session.subscriptions().count(), 0);
        assert_eq!(
            session.sink().sent,
            vec![
                ClientMessage::subscribe(id("PLC1")),
                ClientMessage::unsubscribe(vec![id("PLC1")]),
            ]
        );
    }
}
