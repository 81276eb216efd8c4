//! Public handle for a realtime channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::connection::{ChannelTask, Command};
use crate::listener::{ListenerHandle, ListenerSet};
use crate::transport::{Transport, WsTransport};
use crate::types::{ConnectionState, RealtimeConfig};

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Handle for one logical connection to a server-push endpoint.
///
/// All methods are non-blocking: they forward commands to the background
/// connection task. Sends and subscription changes made while disconnected
/// are absorbed (queued / recorded as desired state) rather than erroring.
///
/// The channel is explicitly owned: construction does not dial, the owner
/// calls [`connect`](Self::connect) during its own init and
/// [`close`](Self::close) exactly once during its teardown. After `close`
/// the object is not reusable.
pub struct RealtimeChannel {
    commands: mpsc::UnboundedSender<Command>,
    listeners: ListenerSet,
    state_rx: watch::Receiver<ConnectionState>,
}

impl RealtimeChannel {
    /// Create a channel using the production WebSocket transport.
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    /// Create a channel over a custom transport.
    pub fn with_transport(config: RealtimeConfig, transport: Arc<dyn Transport>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let listeners = ListenerSet::new();
        let task = ChannelTask::new(config, transport, command_rx, listeners.clone(), state_tx);
        tokio::spawn(task.run());
        Self {
            commands: command_tx,
            listeners,
            state_rx,
        }
    }

    /// Open the connection. Idempotent: a no-op while already connecting,
    /// reconnecting, or open. From the terminal failure state this restarts
    /// a fresh attempt sequence.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Add `channel` to the desired-subscription set. Sent to the server
    /// immediately when open, otherwise replayed on the next open.
    pub fn subscribe(&self, channel: impl Into<String>) {
        let _ = self.commands.send(Command::Subscribe(channel.into()));
    }

    /// Remove `channel` from the desired-subscription set. No error if it
    /// was never subscribed.
    pub fn unsubscribe(&self, channel: impl Into<String>) {
        let _ = self.commands.send(Command::Unsubscribe(channel.into()));
    }

    /// Transmit `message` now if open; otherwise queue it. A send on a
    /// fully closed (but not failed) channel also triggers a connect.
    pub fn send(&self, message: serde_json::Value) {
        let _ = self.commands.send(Command::Send(message));
    }

    /// Register a listener invoked with every parsed inbound message, in
    /// registration order, for the lifetime of the channel. The returned
    /// handle unregisters explicitly; dropping it changes nothing.
    pub fn on_message<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.listeners.register(callback)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for awaiting state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Tear the channel down: cancel any pending reconnect, stop the
    /// heartbeat, terminate the transport, and clear the queue, listeners,
    /// and subscriptions. Terminal.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}
