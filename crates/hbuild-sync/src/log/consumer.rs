use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use hbuild_client::{BuildServer, FetchError, LogStreamResponse, LogTransportKind};
use hbuild_core::LogEvent;

use super::buffer::LogBuffer;
use super::{ChannelState, LogOptions, LogTransport, LogView};
use crate::backoff::reconnect_delay;
use crate::publish::Publisher;

/// SSE event name carrying one [`LogEvent`] as JSON.
const LOG_EVENT: &str = "log";

/// Keeps the log of one package up to date in a background task.
///
/// Push is tried first. A server that answers the stream request with a
/// plain snapshot moves the consumer to polling for the rest of its life.
pub struct LogStreamConsumer {
    rx: watch::Receiver<LogView>,
    publisher: Publisher<LogView>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LogStreamConsumer {
    pub fn start(server: Arc<dyn BuildServer>, package: impl Into<String>, options: LogOptions) -> Self {
        let package = package.into();
        let transport = match options.transport {
            LogTransportKind::Stream => LogTransport::Push,
            LogTransportKind::Poll => LogTransport::Poll,
        };
        let (publisher, rx) = Publisher::new(LogView::new(&package, transport));
        let cancel = CancellationToken::new();
        let worker = Worker {
            server,
            package,
            options,
            publisher: publisher.clone(),
            cancel: cancel.clone(),
            buffer: LogBuffer::new(),
            channel: PushChannel::default(),
        };
        let task = tokio::spawn(worker.run(transport));
        Self {
            rx,
            publisher,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LogView> {
        self.rx.clone()
    }

    pub fn latest(&self) -> LogView {
        self.rx.borrow().clone()
    }

    /// Close the channel. Idempotent; the view is frozen once this returns.
    pub fn stop(&self) {
        self.publisher.close_with(|view| view.state = ChannelState::Closed);
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.publisher.is_closed()
    }
}

impl Drop for LogStreamConsumer {
    fn drop(&mut self) {
        self.stop();
        self.task.abort();
    }
}

/// Connection bookkeeping of the push transport.
#[derive(Debug, Default)]
struct PushChannel {
    /// Id of the last log event received whole.
    last_event_id: Option<u64>,
    /// Failed opens or broken sessions since the last successful open.
    attempt: u32,
    /// Server-requested reconnect base.
    retry: Option<Duration>,
}

enum Session {
    Cancelled,
    /// The server only serves snapshots; switch to polling.
    Snapshot,
    /// Stream failed to open, broke, or ended.
    Lost(String),
}

struct Worker {
    server: Arc<dyn BuildServer>,
    package: String,
    options: LogOptions,
    publisher: Publisher<LogView>,
    cancel: CancellationToken,
    buffer: LogBuffer,
    channel: PushChannel,
}

impl Worker {
    async fn run(mut self, transport: LogTransport) {
        if transport == LogTransport::Push && !self.push().await {
            return;
        }
        self.poll().await;
        tracing::debug!(package = %self.package, "log consumer stopped");
    }

    /// Returns `true` when the consumer should continue with polling.
    async fn push(&mut self) -> bool {
        loop {
            match self.session().await {
                Session::Cancelled => return false,
                Session::Snapshot => {
                    tracing::info!(package = %self.package, "server does not stream logs, polling instead");
                    return self.publish(|view| {
                        view.transport = LogTransport::Poll;
                        view.state = ChannelState::Open;
                        view.error = None;
                    });
                }
                Session::Lost(error) => {
                    self.channel.attempt += 1;
                    let attempt = self.channel.attempt;
                    let delay = reconnect_delay(&self.options.reconnect, attempt, self.channel.retry);
                    tracing::warn!(package = %self.package, attempt, ?delay, %error, "log stream lost, reconnecting");
                    let open = self.publish(|view| {
                        view.state = ChannelState::Reconnecting { attempt };
                        view.error = Some(error);
                    });
                    if !open {
                        return false;
                    }
                    tokio::select! {
                        _ = self.cancel.cancelled() => return false,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One open-read cycle of the event stream.
    async fn session(&mut self) -> Session {
        let after = self.resume_from();
        let server = Arc::clone(&self.server);
        let opened = match self
            .guarded(server.stream_logs(&self.package, after))
            .await
        {
            None => return Session::Cancelled,
            Some(Err(e)) => return Session::Lost(e.to_string()),
            Some(Ok(resp)) => resp,
        };

        let mut bytes = match opened {
            LogStreamResponse::Snapshot(snapshot) => {
                return if self.merge(snapshot.logs) {
                    Session::Snapshot
                } else {
                    Session::Cancelled
                };
            }
            LogStreamResponse::Stream(bytes) => bytes,
        };

        self.channel.attempt = 0;
        tracing::debug!(package = %self.package, ?after, "log stream open");
        if !self.publish(|view| {
            view.state = ChannelState::Open;
            view.error = None;
        }) {
            return Session::Cancelled;
        }

        let mut events = bytes.eventsource();
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Session::Cancelled,
                next = next_within(&mut events, self.options.idle_timeout) => next,
            };
            let event = match next {
                Err(limit) => return Session::Lost(format!("stream idle for {limit:?}")),
                Ok(None) => return Session::Lost("stream ended".to_string()),
                Ok(Some(Err(e))) => return Session::Lost(e.to_string()),
                Ok(Some(Ok(event))) => event,
            };

            if let Some(retry) = event.retry {
                self.channel.retry = Some(retry);
            }
            if event.event != LOG_EVENT {
                tracing::trace!(package = %self.package, event = %event.event, "ignoring stream event");
                continue;
            }
            let log = match serde_json::from_str::<LogEvent>(&event.data) {
                Ok(log) => log,
                Err(e) => {
                    tracing::warn!(package = %self.package, error = %e, "undecodable log event");
                    continue;
                }
            };
            // Only complete events move the resume point.
            let id = event.id.parse().unwrap_or(log.id);
            self.channel.last_event_id = self.channel.last_event_id.max(Some(id));
            if !self.merge(vec![log]) {
                return Session::Cancelled;
            }
        }
    }

    async fn poll(&mut self) {
        let mut ticker = tokio::time::interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            let server = Arc::clone(&self.server);
            let open = match self.guarded(server.logs(&self.package)).await {
                None => return,
                Some(Ok(snapshot)) => {
                    self.merge(snapshot.logs)
                        && self.publish(|view| {
                            view.state = ChannelState::Open;
                            view.error = None;
                        })
                }
                Some(Err(e)) => {
                    tracing::warn!(package = %self.package, error = %e, "log snapshot failed");
                    self.publish(|view| view.error = Some(e.to_string()))
                }
            };
            if !open {
                return;
            }
        }
    }

    /// Run `fut` under the request timeout; `None` if cancelled first.
    async fn guarded<T>(
        &self,
        fut: impl Future<Output = Result<T, FetchError>>,
    ) -> Option<Result<T, FetchError>> {
        let limited = async {
            match self.options.request_timeout {
                Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                    Err(FetchError::Timeout {
                        url: format!("log/{}", self.package),
                    })
                }),
                None => fut.await,
            }
        };
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = limited => Some(result),
        }
    }

    fn resume_from(&self) -> Option<u64> {
        self.buffer.cursor().max(self.channel.last_event_id)
    }

    /// Merge and publish. Returns `false` once the consumer is stopped.
    fn merge(&mut self, events: Vec<LogEvent>) -> bool {
        if self.buffer.merge(events) == 0 {
            return !self.publisher.is_closed();
        }
        let text: Arc<str> = Arc::from(self.buffer.render());
        let cursor = self.buffer.cursor();
        let count = self.buffer.len();
        self.publish(|view| {
            view.text = text;
            view.cursor = cursor;
            view.events = count;
            view.revision += 1;
        })
    }

    fn publish(&self, f: impl FnOnce(&mut LogView)) -> bool {
        self.publisher.update(f)
    }
}

/// Next item of `stream`, or `Err(limit)` if nothing arrives within `limit`.
async fn next_within<S>(stream: &mut S, limit: Option<Duration>) -> Result<Option<S::Item>, Duration>
where
    S: Stream + Unpin,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, stream.next())
            .await
            .map_err(|_| limit),
        None => Ok(stream.next().await),
    }
}
