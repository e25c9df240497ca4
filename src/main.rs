//! tagwatch entry point.
//!
//! Connects to the telemetry server, focuses the devices named on stdin
//! (one per line), and renders the tag table as text.

use std::collections::HashMap;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use tagwatch::api::SnapshotFetcher;
use tagwatch::config::{LogFormat, MonitorConfig};
use tagwatch::domain::{DeviceId, EventBus, TableEvent, TagEntry, TagTableView, Topology};
use tagwatch::service::{MonitorSession, SessionHandle};
use tagwatch::ws::ConnectionChannel;

const COMMAND_CAPACITY: usize = 16;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MonitorConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(
        server = %config.server_url,
        channel = %config.ws_url,
        "starting tagwatch"
    );

    let fetcher = SnapshotFetcher::new(config.server_url.clone())?;
    let topology = match fetcher.fetch_topology().await {
        Ok(topology) => {
            for node in topology.monitorable() {
                tracing::info!(device = %node.name, kind = ?node.kind, "monitorable device");
            }
            Some(topology)
        }
        Err(e) => {
            tracing::warn!(error = %e, "topology unavailable, accepting any device name");
            None
        }
    };

    let (channel, inbound) = ConnectionChannel::connect(&config.ws_url, config.inbound_capacity)
        .await
        .context("connecting to telemetry channel")?;

    let bus = EventBus::new(config.table_event_capacity);
    let table = TagTableView::new(bus.clone(), config.flash_duration);
    let renderer = tokio::spawn(render(bus.subscribe()));

    let session = MonitorSession::new(fetcher, channel, table);
    let (handle, task) = session.start(inbound, COMMAND_CAPACITY);

    if let Some(device) = &config.initial_device {
        request_focus(&handle, topology.as_ref(), device.as_str()).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let name = line.trim();
                    if !name.is_empty() && !request_focus(&handle, topology.as_ref(), name).await {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down");
                break;
            }
        }
    }

    drop(handle);
    match task.await {
        Ok(session) => session.into_sink().close().await,
        Err(e) => tracing::error!(error = %e, "monitor session task failed"),
    }
    renderer.abort();
    Ok(())
}

/// Initializes the global tracing subscriber.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Forwards a focus request, rejecting names the topology says have no
/// tags. Returns `false` once the session has stopped.
async fn request_focus(handle: &SessionHandle, topology: Option<&Topology>, name: &str) -> bool {
    let device = match topology.map(|t| t.find(name)) {
        None => DeviceId::from(name),
        Some(Some(node)) if node.is_monitorable() => node.device_id(),
        Some(Some(node)) => {
            tracing::warn!(device = name, kind = ?node.kind, "device has no monitorable tags");
            return true;
        }
        Some(None) => {
            tracing::warn!(device = name, "device not in topology");
            return true;
        }
    };

    match handle.focus(device).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "focus request dropped");
            false
        }
    }
}

/// Prints table events until the bus closes.
async fn render(mut events: broadcast::Receiver<TableEvent>) {
    let mut view = TextView::default();
    loop {
        match events.recv().await {
            Ok(event) => {
                for line in view.apply(event) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "renderer lagged behind table events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Text rendering of the table, mirrored from its events.
#[derive(Debug, Default)]
struct TextView {
    epoch: u64,
    rows: Vec<TagEntry>,
    flashing: HashMap<usize, u64>,
}

impl TextView {
    /// Applies one event and returns the lines to print.
    fn apply(&mut self, event: TableEvent) -> Vec<String> {
        match event {
            TableEvent::TitleChanged { title } => vec![format!("== {title} ==")],
            TableEvent::Replaced { epoch, rows, .. } => {
                self.epoch = epoch;
                self.rows = rows;
                self.flashing.clear();
                self.rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| format!("{:>4}  {:<24} {}", i + 1, row.name, row.value))
                    .collect()
            }
            TableEvent::RowChanged {
                epoch,
                index,
                name,
                value,
            } => {
                let slot = index.checked_sub(1).and_then(|i| self.rows.get_mut(i));
                match slot {
                    Some(row) if epoch == self.epoch => {
                        row.value = value;
                        vec![format!("{index:>4}* {name:<24} {}", row.value)]
                    }
                    _ => {
                        tracing::debug!(epoch, index, "changed row is not displayed");
                        Vec::new()
                    }
                }
            }
            TableEvent::FlashStarted(target) => {
                if target.epoch == self.epoch {
                    self.flashing.insert(target.index, target.generation);
                }
                Vec::new()
            }
            TableEvent::FlashCleared(target) => {
                if self.flashing.get(&target.index) == Some(&target.generation)
                    && target.epoch == self.epoch
                {
                    self.flashing.remove(&target.index);
                } else {
                    tracing::trace!(index = target.index, "stale flash clear ignored");
                }
                Vec::new()
            }
        }
    }
}
