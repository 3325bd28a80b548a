//! Periodic snapshot polling with last-request-wins ordering.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use hbuild_client::FetchError;
use hbuild_core::{PackageList, StatusDiff};

use crate::publish::Publisher;

// ── Source ──

/// One pollable endpoint.
#[async_trait::async_trait]
pub trait Source: Send + Sync + 'static {
    type Output: PartialEq + Send + Sync + 'static;

    /// Endpoint identity, for logs and timeout errors.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Self::Output, FetchError>;
}

// ── Published state ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollPhase {
    /// No request has completed yet.
    Loading,
    Ready,
    /// The latest request failed; `data` still holds the last good snapshot.
    Stale { error: String },
    /// Nothing has ever loaded. Views treat this as blocking.
    Failed { error: String },
}

/// What subscribers observe.
#[derive(Debug)]
pub struct PollState<T> {
    pub data: Option<Arc<T>>,
    /// Snapshot `data` replaced, for change detection.
    pub previous: Option<Arc<T>>,
    /// Bumped only when `data` changes value.
    pub revision: u64,
    pub phase: PollPhase,
    /// A request is in flight.
    pub loading: bool,
    /// Sequence number of the request behind the current phase.
    pub applied_seq: u64,
    /// Responses thrown away because a newer request already landed.
    pub discarded: u64,
    pub last_success: Option<Instant>,
    pub last_request: Option<Instant>,
}

impl<T> Clone for PollState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            previous: self.previous.clone(),
            revision: self.revision,
            phase: self.phase.clone(),
            loading: self.loading,
            applied_seq: self.applied_seq,
            discarded: self.discarded,
            last_success: self.last_success,
            last_request: self.last_request,
        }
    }
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: None,
            previous: None,
            revision: 0,
            phase: PollPhase::Loading,
            loading: false,
            applied_seq: 0,
            discarded: 0,
            last_success: None,
            last_request: None,
        }
    }
}

impl<T> PollState<T> {
    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            PollPhase::Stale { error } | PollPhase::Failed { error } => Some(error),
            PollPhase::Loading | PollPhase::Ready => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.phase, PollPhase::Stale { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.phase, PollPhase::Failed { .. })
    }
}

impl<T: PartialEq> PollState<T> {
    /// Apply the outcome of request `seq`. Returns `false` when the outcome
    /// is older than what is already shown and was dropped.
    fn apply(&mut self, seq: u64, outcome: Result<T, String>) -> bool {
        if seq <= self.applied_seq {
            self.discarded += 1;
            return false;
        }
        self.applied_seq = seq;
        match outcome {
            Ok(value) => {
                if self.data.as_deref() != Some(&value) {
                    self.previous = self.data.take();
                    self.data = Some(Arc::new(value));
                    self.revision += 1;
                }
                self.phase = PollPhase::Ready;
                self.last_success = Some(Instant::now());
            }
            Err(error) => {
                self.phase = if self.data.is_some() {
                    PollPhase::Stale { error }
                } else {
                    PollPhase::Failed { error }
                };
            }
        }
        true
    }
}

impl PollState<PackageList> {
    /// Status changes between the previous and the current snapshot.
    pub fn diff(&self) -> StatusDiff {
        match (&self.previous, &self.data) {
            (Some(prev), Some(next)) => StatusDiff::between(prev, next),
            (None, Some(next)) => StatusDiff::between(&PackageList::default(), next),
            _ => StatusDiff::default(),
        }
    }
}

// ── Options ──

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    /// A request running longer than this fails its tick.
    pub timeout: Option<Duration>,
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ── Poller ──

/// Polls a [`Source`] on an interval until stopped.
///
/// * a tick is skipped while any request is in flight;
/// * [`Poller::refresh`] forces a request regardless;
/// * the newest request wins, late answers to older requests are dropped;
/// * failures are published and polling carries on.
pub struct Poller<T> {
    rx: watch::Receiver<PollState<T>>,
    publisher: Publisher<PollState<T>>,
    refresh_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub type StatusPoller = Poller<PackageList>;

impl<T: PartialEq + Send + Sync + 'static> Poller<T> {
    /// Spawn the polling task on the current tokio runtime. The first
    /// request goes out immediately.
    pub fn start<S>(source: S, options: PollOptions) -> Self
    where
        S: Source<Output = T>,
    {
        let (publisher, rx) = Publisher::new(PollState::default());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::new(source),
            options,
            publisher.clone(),
            refresh_rx,
            cancel.clone(),
        ));
        Self {
            rx,
            publisher,
            refresh_tx,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.rx.clone()
    }

    pub fn latest(&self) -> PollState<T> {
        self.rx.borrow().clone()
    }

    /// Ask for an immediate request, even if one is already in flight.
    pub fn refresh(&self) {
        // A full queue already holds a pending refresh.
        let _ = self.refresh_tx.try_send(());
    }

    /// Stop polling. Idempotent; nothing is published after this returns.
    pub fn stop(&self) {
        self.publisher.close();
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.publisher.is_closed()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.publisher.close();
        self.cancel.cancel();
        self.task.abort();
    }
}

type Completion<T> = (u64, Result<T, FetchError>);

async fn run<S: Source>(
    source: Arc<S>,
    options: PollOptions,
    publisher: Publisher<PollState<S::Output>>,
    mut refresh_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: FuturesUnordered<BoxFuture<'static, Completion<S::Output>>> =
        FuturesUnordered::new();
    let mut issued: u64 = 0;

    loop {
        let launch = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if in_flight.is_empty() {
                    true
                } else {
                    tracing::debug!(source = source.name(), "previous request still running, skipping tick");
                    false
                }
            }
            Some(()) = refresh_rx.recv() => true,
            Some((seq, result)) = in_flight.next(), if !in_flight.is_empty() => {
                let outcome = result.map_err(|e| e.to_string());
                if let Err(error) = &outcome {
                    tracing::warn!(source = source.name(), seq, %error, "poll failed");
                }
                let still_loading = !in_flight.is_empty();
                let mut applied = true;
                let open = publisher.update(|state| {
                    applied = state.apply(seq, outcome);
                    state.loading = still_loading;
                });
                if !applied {
                    tracing::debug!(source = source.name(), seq, "discarding response older than current snapshot");
                }
                if !open {
                    break;
                }
                false
            }
        };

        if launch {
            issued += 1;
            in_flight.push(fetch_once(Arc::clone(&source), issued, options.timeout));
            let open = publisher.update(|state| {
                state.loading = true;
                state.last_request = Some(Instant::now());
            });
            if !open {
                break;
            }
        }
    }
    tracing::debug!(source = source.name(), "poller stopped");
}

fn fetch_once<S: Source>(
    source: Arc<S>,
    seq: u64,
    timeout: Option<Duration>,
) -> BoxFuture<'static, Completion<S::Output>> {
    async move {
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: source.name().to_string(),
                }),
            },
            None => source.fetch().await,
        };
        (seq, result)
    }
    .boxed()
}
