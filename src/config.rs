//! Monitor configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::time::Duration;

use url::Url;

use crate::domain::DeviceId;
use crate::error::MonitorError;

/// Port the telemetry channel listens on when `WS_URL` is not set.
pub const DEFAULT_WS_PORT: u16 = 8000;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Top-level monitor configuration.
///
/// Loaded once at startup via [`MonitorConfig::from_env`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base URL of the HTTP server (snapshots and topology).
    pub server_url: Url,

    /// URL of the persistent telemetry channel.
    pub ws_url: Url,

    /// How long a changed row stays highlighted.
    pub flash_duration: Duration,

    /// Bound of the inbound event queue.
    pub inbound_capacity: usize,

    /// Capacity of the table event broadcast channel.
    pub table_event_capacity: usize,

    /// Device to focus right after connecting.
    pub initial_device: Option<DeviceId>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl MonitorConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `SERVER_URL` or `WS_URL` is set but is not a
    /// valid URL, or if the channel URL cannot be derived.
    pub fn from_env() -> Result<Self, MonitorError> {
        dotenvy::dotenv().ok();

        let server_url = Url::parse(
            &std::env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:80/".to_string()),
        )?;

        let ws_url = match std::env::var("WS_URL") {
            Ok(raw) => Url::parse(&raw)?,
            Err(_) => derive_ws_url(&server_url, parse_env("WS_PORT", DEFAULT_WS_PORT))?,
        };

        let flash_duration = Duration::from_millis(parse_env("FLASH_DURATION_MS", 100));
        let inbound_capacity = parse_env("INBOUND_CHANNEL_CAPACITY", 1024);
        let table_event_capacity = parse_env("TABLE_EVENT_CAPACITY", 1024);

        let initial_device = std::env::var("INITIAL_DEVICE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(DeviceId::from);

        let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            server_url,
            ws_url,
            flash_duration,
            inbound_capacity,
            table_event_capacity,
            initial_device,
            log_format,
        })
    }
}

/// Derives the channel URL from the HTTP server URL.
///
/// `http` maps to `ws` and `https` to `wss`; the host is kept, the port is
/// replaced by `port`, and the path is `/`.
///
/// # Errors
///
/// Returns [`MonitorError::Config`] if `server_url` has no host or an
/// unsupported scheme.
pub fn derive_ws_url(server_url: &Url, port: u16) -> Result<Url, MonitorError> {
    let scheme = match server_url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(MonitorError::Config(format!(
                "cannot derive channel URL from scheme {other:?}"
            )));
        }
    };
    let host = server_url
        .host_str()
        .ok_or_else(|| MonitorError::Config(format!("{server_url} has no host")))?;

    Ok(Url::parse(&format!("{scheme}://{host}:{port}/"))?)
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
