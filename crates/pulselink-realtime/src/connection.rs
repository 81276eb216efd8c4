//! Connection state machine with auto-reconnect.
//!
//! A single background task owns the transport, the desired-subscription
//! set, the outbound queue, and every timer. All reentry points (caller
//! commands, transport frames, the backoff sleep, the heartbeat tick) are
//! arms of that task's `select!`, biased toward commands so a queued
//! `close()` always wins over a later-ready timer. Once the task has
//! processed `Close`, no timer or transport callback can fire again.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::listener::ListenerSet;
use crate::protocol::{self, Directive};
use crate::transport::{Connection, Transport, TransportError};
use crate::types::{retry_delay, ConnectionState, RealtimeConfig};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent from the public handle to the connection task.
pub(crate) enum Command {
    Connect,
    Subscribe(String),
    Unsubscribe(String),
    Send(serde_json::Value),
    Close,
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Where the state machine goes next. Each phase is driven by its own
/// transition function below.
enum Phase {
    /// No transport, no retry pending. A send restarts the dial.
    Idle,
    /// Dial a fresh connection.
    Connecting,
    /// Reconnect scheduled after an unexpected loss.
    Backoff(Duration),
    /// Transport established.
    Open(Box<dyn Connection>),
    /// Retry budget exhausted; only an explicit connect resumes.
    Failed,
    /// Terminal.
    Closing,
}

/// Result of a spawned dial, tagged with the epoch that started it so a
/// superseded attempt's socket is dropped instead of adopted.
type DialOutcome = (u64, Result<Box<dyn Connection>, TransportError>);

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

pub(crate) struct ChannelTask {
    config: RealtimeConfig,
    transport: Arc<dyn Transport>,
    commands: mpsc::UnboundedReceiver<Command>,
    listeners: ListenerSet,
    state_tx: watch::Sender<ConnectionState>,
    /// Desired subscriptions, replayed on every open transition.
    subscriptions: HashSet<String>,
    /// Messages accepted while not open, drained FIFO on open.
    outbound: VecDeque<serde_json::Value>,
    /// Consecutive failed attempts since the last successful open.
    retries: u32,
    /// Bumped on every dial; see [`DialOutcome`].
    epoch: u64,
    dial_tx: mpsc::UnboundedSender<DialOutcome>,
    dial_rx: mpsc::UnboundedReceiver<DialOutcome>,
}

impl ChannelTask {
    pub(crate) fn new(
        config: RealtimeConfig,
        transport: Arc<dyn Transport>,
        commands: mpsc::UnboundedReceiver<Command>,
        listeners: ListenerSet,
        state_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        let (dial_tx, dial_rx) = mpsc::unbounded_channel();
        Self {
            config,
            transport,
            commands,
            listeners,
            state_tx,
            subscriptions: HashSet::new(),
            outbound: VecDeque::new(),
            retries: 0,
            epoch: 0,
            dial_tx,
            dial_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle => self.idle(ConnectionState::Disconnected).await,
                Phase::Failed => self.idle(ConnectionState::Failed).await,
                Phase::Connecting => self.dial().await,
                Phase::Backoff(delay) => self.backoff(delay).await,
                Phase::Open(conn) => self.serve(conn).await,
                Phase::Closing => break,
            };
        }
        self.teardown();
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    // -----------------------------------------------------------------------
    // Idle (Disconnected / Failed)
    // -----------------------------------------------------------------------

    async fn idle(&mut self, state: ConnectionState) -> Phase {
        self.set_state(state);
        let failed = state == ConnectionState::Failed;
        loop {
            match self.commands.recv().await {
                None | Some(Command::Close) => return Phase::Closing,
                Some(Command::Connect) => {
                    // An explicit connect starts a fresh attempt sequence.
                    self.retries = 0;
                    return Phase::Connecting;
                }
                Some(Command::Subscribe(channel)) => {
                    self.subscriptions.insert(channel);
                }
                Some(Command::Unsubscribe(channel)) => {
                    self.subscriptions.remove(&channel);
                }
                Some(Command::Send(message)) => {
                    self.outbound.push_back(message);
                    // A send on a fully closed channel restarts the dial;
                    // after retry exhaustion it only queues.
                    if !failed {
                        self.retries = 0;
                        return Phase::Connecting;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Connecting
    // -----------------------------------------------------------------------

    async fn dial(&mut self) -> Phase {
        self.set_state(ConnectionState::Connecting);
        self.epoch += 1;
        let epoch = self.epoch;
        let transport = Arc::clone(&self.transport);
        let endpoint = self.config.endpoint.clone();
        let results = self.dial_tx.clone();
        info!(endpoint = %endpoint, attempt = self.retries + 1, "dialing");

        tokio::spawn(async move {
            let outcome = transport.connect(&endpoint).await;
            if let Err(unsent) = results.send((epoch, outcome)) {
                // The task is gone; close the socket we just opened.
                if let (_, Ok(mut conn)) = unsent.0 {
                    conn.close().await;
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    None | Some(Command::Close) => return Phase::Closing,
                    Some(Command::Connect) => {}
                    Some(Command::Subscribe(channel)) => {
                        self.subscriptions.insert(channel);
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        self.subscriptions.remove(&channel);
                    }
                    Some(Command::Send(message)) => self.outbound.push_back(message),
                },
                Some((dial_epoch, outcome)) = self.dial_rx.recv() => {
                    if dial_epoch != self.epoch {
                        debug!(epoch = dial_epoch, "discarding stale dial result");
                        if let Ok(mut conn) = outcome {
                            conn.close().await;
                        }
                        continue;
                    }
                    match outcome {
                        Ok(conn) => return self.opened(conn).await,
                        Err(e) => {
                            warn!(error = %e, "connect failed");
                            return self.connection_lost();
                        }
                    }
                }
            }
        }
    }

    /// Open transition: reset the retry counter, replay the desired
    /// subscription set, then drain the outbound queue FIFO.
    async fn opened(&mut self, mut conn: Box<dyn Connection>) -> Phase {
        info!("connection open");
        self.retries = 0;
        self.set_state(ConnectionState::Open);

        // The server is assumed stateless across reconnects: every desired
        // subscription is replayed whether or not it was active before.
        let channels: Vec<String> = self.subscriptions.iter().cloned().collect();
        for channel in channels {
            let frame = Directive::Subscribe { channel }.to_frame();
            if let Err(e) = conn.send(frame).await {
                warn!(error = %e, "connection dropped during subscription replay");
                return self.connection_lost();
            }
        }

        // Stop draining the moment the transport drops; whatever was not
        // transmitted stays queued for the next open.
        while let Some(front) = self.outbound.front() {
            let frame = match serde_json::to_string(front) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "dropping unserializable queued message");
                    self.outbound.pop_front();
                    continue;
                }
            };
            if let Err(e) = conn.send(frame).await {
                warn!(error = %e, "connection dropped while draining queue");
                return self.connection_lost();
            }
            self.outbound.pop_front();
        }

        Phase::Open(conn)
    }

    // -----------------------------------------------------------------------
    // Open
    // -----------------------------------------------------------------------

    async fn serve(&mut self, mut conn: Box<dyn Connection>) -> Phase {
        // The heartbeat timer starts fresh on every open transition and
        // does not run in any other phase.
        let period = self.config.heartbeat_interval;
        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    None | Some(Command::Close) => {
                        conn.close().await;
                        return Phase::Closing;
                    }
                    Some(Command::Connect) => {}
                    Some(Command::Subscribe(channel)) => {
                        // Membership is idempotent; only a change in the
                        // desired set goes out on the wire.
                        if self.subscriptions.insert(channel.clone()) {
                            let frame = Directive::Subscribe { channel }.to_frame();
                            if let Err(e) = conn.send(frame).await {
                                warn!(error = %e, "subscribe send failed");
                                return self.connection_lost();
                            }
                        }
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        if self.subscriptions.remove(&channel) {
                            let frame = Directive::Unsubscribe { channel }.to_frame();
                            if let Err(e) = conn.send(frame).await {
                                warn!(error = %e, "unsubscribe send failed");
                                return self.connection_lost();
                            }
                        }
                    }
                    Some(Command::Send(message)) => {
                        match serde_json::to_string(&message) {
                            Ok(frame) => {
                                if let Err(e) = conn.send(frame).await {
                                    // Not transmitted; keep it for the next open.
                                    self.outbound.push_back(message);
                                    warn!(error = %e, "send failed");
                                    return self.connection_lost();
                                }
                            }
                            Err(e) => warn!(error = %e, "dropping unserializable message"),
                        }
                    }
                },
                frame = conn.recv() => match frame {
                    Some(Ok(raw)) => {
                        if let Some(message) = protocol::parse_inbound(&raw) {
                            self.listeners.dispatch(&message);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "transport error");
                        return self.connection_lost();
                    }
                    None => {
                        info!("server closed connection");
                        return self.connection_lost();
                    }
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = conn.send(Directive::Ping.to_frame()).await {
                        warn!(error = %e, "heartbeat send failed");
                        return self.connection_lost();
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reconnect scheduling
    // -----------------------------------------------------------------------

    /// Unexpected loss while not explicitly closed: schedule a reconnect or,
    /// past the retry budget, deliver one terminal notice and stop.
    fn connection_lost(&mut self) -> Phase {
        self.retries += 1;
        if self.retries > self.config.max_retries {
            warn!(
                attempts = self.config.max_retries,
                "retry budget exhausted; giving up"
            );
            self.listeners
                .dispatch(&protocol::reconnect_failed_notice(self.config.max_retries));
            return Phase::Failed;
        }
        let delay = retry_delay(&self.config, self.retries);
        info!(
            attempt = self.retries,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        Phase::Backoff(delay)
    }

    async fn backoff(&mut self, delay: Duration) -> Phase {
        self.set_state(ConnectionState::Connecting);
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    None | Some(Command::Close) => return Phase::Closing,
                    // A reconnect is already scheduled.
                    Some(Command::Connect) => {}
                    Some(Command::Subscribe(channel)) => {
                        self.subscriptions.insert(channel);
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        self.subscriptions.remove(&channel);
                    }
                    Some(Command::Send(message)) => self.outbound.push_back(message),
                },
                _ = &mut sleep => return Phase::Connecting,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    fn teardown(&mut self) {
        self.set_state(ConnectionState::Closing);
        self.outbound.clear();
        self.subscriptions.clear();
        self.listeners.clear();
        info!("channel closed");
    }
}
