//! Connection state machine for long-lived streaming endpoints.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::TryStreamExt;
use tether_client::{AppLifecycle, NetworkMonitor, TetherClient};
use tether_config::StreamConfig;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{Notify, mpsc, watch};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backoff::Backoff;
use crate::coalesce::OutputCoalescer;
use crate::error::TransportError;
use crate::wire::{Frame, LineDecoder, SessionEvent, StreamKind, TerminalFrame};

/// Events buffered between the worker and a slow consumer.
const EVENT_BUFFER: usize = 256;

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Where to connect and how to read what comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub url: Url,
    pub kind: StreamKind,
}

impl StreamEndpoint {
    /// Output stream of a terminal session.
    pub fn terminal(client: &TetherClient, terminal_id: &str) -> tether_client::Result<Self> {
        Ok(Self {
            url: client.terminals().stream_url(terminal_id)?,
            kind: StreamKind::Terminal,
        })
    }

    /// Session event stream, optionally narrowed to one session.
    pub fn session_events(
        client: &TetherClient,
        session_id: Option<&str>,
    ) -> tether_client::Result<Self> {
        Ok(Self {
            url: client.events().stream_url()?,
            kind: StreamKind::SessionEvents {
                session_id: session_id.map(str::to_string),
            },
        })
    }
}

/// Connection state of one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying: before the first attempt or while suspended.
    Idle,
    Connecting,
    Connected,
    /// Waiting out the backoff after failed attempt number `attempt`.
    Reconnecting { attempt: u32 },
    /// Exited, or gave up until [`TransportHandle::retry`].
    Terminated,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {})", attempt),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// How a terminal process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: i32,
    pub signal: Option<i32>,
}

/// Everything a transport reports, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Response headers received.
    Connected,
    /// A coalesced batch of output text.
    Output(String),
    /// A session event that passed the session filter.
    Event(SessionEvent),
    /// Attempt `attempt` failed; the next one starts after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// The remote process exited. Always the last event of a stream.
    Exit(ExitStatus),
    /// Fatal error. Only [`TransportError::Exhausted`] is reported here.
    Error(TransportError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Opens reconnecting streams.
///
/// Holds the collaborators every stream needs. Each [`open`](Self::open)
/// spawns an independent worker task.
#[derive(Clone)]
pub struct StreamTransport {
    client: TetherClient,
    config: StreamConfig,
    network: NetworkMonitor,
    lifecycle: AppLifecycle,
}

impl StreamTransport {
    pub fn new(
        client: TetherClient,
        config: StreamConfig,
        network: NetworkMonitor,
        lifecycle: AppLifecycle,
    ) -> Self {
        Self {
            client,
            config,
            network,
            lifecycle,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Replace the configuration used by streams opened from now on.
    pub fn set_config(&mut self, config: StreamConfig) {
        self.config = config;
    }

    /// Start streaming from `endpoint`.
    ///
    /// The first attempt starts as soon as the app is in the foreground and
    /// the network is not offline. Must be called inside a Tokio runtime.
    pub fn open(&self, endpoint: StreamEndpoint) -> (TransportHandle, TransportEvents) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (state, _) = watch::channel(ConnectionState::Idle);
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            state,
            retry: Notify::new(),
        });

        tracing::debug!(url = %endpoint.url, "Opening stream");

        let worker = Worker {
            link: Link {
                client: self.client.clone(),
                decoder: LineDecoder::new(endpoint.kind.clone(), self.config.raw_fallback_max_len),
                url: endpoint.url,
                coalescer: OutputCoalescer::new(self.config.flush_interval()),
                backoff: Backoff::from_config(&self.config),
                failures: 0,
                attempt_timeout: self.config.attempt_timeout(),
                tx,
                shared: shared.clone(),
            },
            signals: Signals::new(self.network.clone(), self.lifecycle.clone()),
            max_retries: self.config.max_retries.max(1),
        };
        tokio::spawn(worker.run());

        (
            TransportHandle {
                shared: shared.clone(),
            },
            TransportEvents { rx, shared },
        )
    }
}

/// Controls one open stream. Clones control the same stream.
#[derive(Clone)]
pub struct TransportHandle {
    shared: Arc<Shared>,
}

impl TransportHandle {
    /// Stop the stream.
    ///
    /// Takes effect immediately: no event is delivered after this returns,
    /// including events already queued.
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            self.shared.cancel.cancel();
            self.shared.state.send_replace(ConnectionState::Terminated);
            tracing::debug!("Stream closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start over after the retry budget was exhausted.
    ///
    /// Does nothing unless the stream gave up; an exited or closed stream
    /// stays terminated.
    pub fn retry(&self) {
        if !self.is_closed() && self.state() == ConnectionState::Terminated {
            self.shared.retry.notify_one();
        }
    }
}

/// Receiving side of an open stream.
pub struct TransportEvents {
    rx: mpsc::Receiver<TransportEvent>,
    shared: Arc<Shared>,
}

impl TransportEvents {
    /// Next event, or `None` once the stream is closed or finished.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        if self.shared.is_closed() {
            return None;
        }
        let event = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }?;
        if self.shared.is_closed() {
            return None;
        }
        Some(event)
    }
}

struct Shared {
    closed: AtomicBool,
    cancel: CancellationToken,
    state: watch::Sender<ConnectionState>,
    retry: Notify,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        if self.is_closed() {
            return;
        }
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

enum Outcome {
    Exited(ExitStatus),
    Failed(TransportError),
    Suspended,
    Cancelled,
}

/// Foreground and connectivity signals deciding whether to stay connected.
struct Signals {
    network: NetworkMonitor,
    lifecycle: AppLifecycle,
    network_rx: watch::Receiver<tether_client::NetworkStatus>,
    lifecycle_rx: watch::Receiver<tether_client::AppState>,
}

impl Signals {
    fn new(network: NetworkMonitor, lifecycle: AppLifecycle) -> Self {
        Self {
            network_rx: network.subscribe(),
            lifecycle_rx: lifecycle.subscribe(),
            network,
            lifecycle,
        }
    }

    fn is_active(&self) -> bool {
        self.lifecycle.is_foreground() && !self.network.is_offline()
    }

    async fn changed(&mut self) {
        // Both senders are owned by `self`, so `changed` cannot fail.
        tokio::select! {
            _ = self.network_rx.changed() => {}
            _ = self.lifecycle_rx.changed() => {}
        }
    }

    async fn until_active(&mut self) {
        while !self.is_active() {
            self.changed().await;
        }
    }

    async fn until_inactive(&mut self) {
        while self.is_active() {
            self.changed().await;
        }
    }
}

/// One connection attempt and the state it carries across attempts.
struct Link {
    client: TetherClient,
    url: Url,
    decoder: LineDecoder,
    coalescer: OutputCoalescer,
    backoff: Backoff,
    failures: u32,
    attempt_timeout: Duration,
    tx: mpsc::Sender<TransportEvent>,
    shared: Arc<Shared>,
}

impl Link {
    /// Deliver an event. Returns false when nobody is listening anymore.
    async fn emit(&self, event: TransportEvent) -> bool {
        if self.shared.is_closed() {
            return false;
        }
        if self.tx.send(event).await.is_err() {
            self.shared.cancel.cancel();
            return false;
        }
        true
    }

    async fn flush(&mut self) -> bool {
        match self.coalescer.take() {
            Some(batch) => self.emit(TransportEvent::Output(batch)).await,
            None => true,
        }
    }

    fn reset(&mut self) {
        self.backoff.reset();
        self.failures = 0;
    }

    async fn connect_and_read(&mut self) -> Outcome {
        self.shared.set_state(ConnectionState::Connecting);
        tracing::debug!(url = %self.url, "Connecting");

        let response = match tokio::time::timeout(
            self.attempt_timeout,
            self.client.open_stream(self.url.clone()),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Outcome::Failed(e.into()),
            Err(_) => return Outcome::Failed(TransportError::Timeout(self.attempt_timeout)),
        };

        self.reset();
        self.shared.set_state(ConnectionState::Connected);
        tracing::info!(url = %self.url, "Stream connected");
        if !self.emit(TransportEvent::Connected).await {
            return Outcome::Cancelled;
        }

        let body = response.bytes_stream().map_err(io::Error::other);
        let mut lines = StreamReader::new(Box::pin(body)).lines();

        loop {
            tokio::select! {
                batch = self.coalescer.ready() => {
                    if !self.emit(TransportEvent::Output(batch)).await {
                        return Outcome::Cancelled;
                    }
                }
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => return Outcome::Failed(TransportError::Closed),
                        Err(e) => return Outcome::Failed(TransportError::Read(e.to_string())),
                    };
                    match self.decoder.decode(&line) {
                        None | Some(Frame::Terminal(TerminalFrame::Connected)) => {}
                        Some(Frame::Done) => {
                            if !self.flush().await {
                                return Outcome::Cancelled;
                            }
                        }
                        Some(Frame::Terminal(TerminalFrame::Data { data })) => {
                            self.coalescer.enqueue(&data);
                        }
                        Some(Frame::Raw(text)) => self.coalescer.enqueue(&text),
                        Some(Frame::Event(event)) => {
                            if !self.flush().await || !self.emit(TransportEvent::Event(event)).await {
                                return Outcome::Cancelled;
                            }
                        }
                        Some(Frame::Terminal(TerminalFrame::Exit { exit_code, signal })) => {
                            return Outcome::Exited(ExitStatus {
                                code: exit_code,
                                signal,
                            });
                        }
                    }
                }
            }
        }
    }
}

struct Worker {
    link: Link,
    signals: Signals,
    max_retries: u32,
}

impl Worker {
    async fn run(mut self) {
        let cancel = self.link.shared.cancel.clone();

        'connect: loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.signals.until_active() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Outcome::Cancelled,
                _ = self.signals.until_inactive() => Outcome::Suspended,
                outcome = self.link.connect_and_read() => outcome,
            };

            let err = match outcome {
                Outcome::Cancelled => break,
                Outcome::Suspended => {
                    self.suspend().await;
                    continue;
                }
                Outcome::Exited(status) => {
                    tracing::info!(url = %self.link.url, code = status.code, "Stream exited");
                    if self.link.flush().await {
                        self.link.shared.set_state(ConnectionState::Terminated);
                        self.link.emit(TransportEvent::Exit(status)).await;
                    }
                    break;
                }
                Outcome::Failed(err) => err,
            };

            if !self.link.flush().await {
                break;
            }
            self.link.failures += 1;
            let attempt = self.link.failures;

            if attempt >= self.max_retries {
                tracing::warn!(url = %self.link.url, attempts = attempt, error = %err, "Giving up on stream");
                self.link.shared.set_state(ConnectionState::Terminated);
                let fatal = TransportError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                };
                if !self.link.emit(TransportEvent::Error(fatal)).await {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = self.link.shared.retry.notified() => {
                        tracing::info!(url = %self.link.url, "Retrying stream");
                        self.link.reset();
                        self.link.shared.set_state(ConnectionState::Idle);
                        continue 'connect;
                    }
                }
            }

            let delay = self.link.backoff.next_delay();
            tracing::debug!(url = %self.link.url, attempt, ?delay, error = %err, "Stream attempt failed");
            self.link.shared.set_state(ConnectionState::Reconnecting { attempt });
            if !self
                .link
                .emit(TransportEvent::Reconnecting { attempt, delay })
                .await
            {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.signals.until_inactive() => self.suspend().await,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::debug!(url = %self.link.url, "Stream worker stopped");
    }

    /// Drop the connection without spending retry budget.
    async fn suspend(&mut self) {
        tracing::debug!(url = %self.link.url, "Suspending stream");
        self.link.flush().await;
        self.link.reset();
        self.link.shared.set_state(ConnectionState::Idle);
    }
}
