//! Live build log for one package: ordered, gap-free, duplicate-free text.

mod buffer;
mod consumer;

pub use buffer::LogBuffer;
pub use consumer::LogStreamConsumer;

use std::sync::Arc;
use std::time::Duration;

use hbuild_client::{ClientConfig, LogTransportKind, ReconnectConfig};

/// Transport currently feeding a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTransport {
    /// Server-sent events.
    Push,
    /// Repeated full snapshots.
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    /// Waiting out the backoff before reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
    Closed,
}

/// What subscribers of a [`LogStreamConsumer`] observe.
#[derive(Debug, Clone)]
pub struct LogView {
    pub package: String,
    pub text: Arc<str>,
    /// Highest event id merged so far.
    pub cursor: Option<u64>,
    pub events: usize,
    pub state: ChannelState,
    pub transport: LogTransport,
    /// Most recent transport error, cleared by the next successful read.
    pub error: Option<String>,
    /// Bumped whenever `text` grows.
    pub revision: u64,
}

impl LogView {
    fn new(package: &str, transport: LogTransport) -> Self {
        Self {
            package: package.to_string(),
            text: Arc::from(""),
            cursor: None,
            events: 0,
            state: ChannelState::Connecting,
            transport,
            error: None,
            revision: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub transport: LogTransportKind,
    /// Snapshot interval when polling.
    pub poll_interval: Duration,
    pub reconnect: ReconnectConfig,
    /// Limit on a snapshot fetch or on opening the stream. The open stream
    /// itself is bounded by `idle_timeout` instead.
    pub request_timeout: Option<Duration>,
    /// Longest silence tolerated on an open stream before reconnecting.
    pub idle_timeout: Option<Duration>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            transport: LogTransportKind::Stream,
            poll_interval: Duration::from_secs(1),
            reconnect: ReconnectConfig::default(),
            request_timeout: None,
            idle_timeout: None,
        }
    }
}

impl LogOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            transport: config.log_transport,
            poll_interval: config.log_interval(),
            reconnect: config.reconnect.clone(),
            request_timeout: Some(config.request_timeout()),
            idle_timeout: config.stream_idle_timeout(),
        }
    }
}
