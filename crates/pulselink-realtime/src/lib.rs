//! Realtime update channel over WebSocket.
//!
//! One [`RealtimeChannel`] owns one logical connection to a server-push
//! endpoint: it manages connect/retry with exponential backoff, replays
//! the desired subscription set on every open, queues outbound messages
//! while disconnected, sends periodic keep-alive pings, and fans inbound
//! messages out to registered listeners.

mod channel;
mod connection;
mod listener;
mod protocol;
mod transport;
mod types;


pub use channel::RealtimeChannel;
pub use listener::ListenerHandle;
pub use transport::{Connection, Transport, TransportError, WsTransport};
pub use types::{ConnectionState, RealtimeConfig};
