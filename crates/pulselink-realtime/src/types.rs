//! Configuration and connection-state types for the realtime channel.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a realtime channel.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint URL (e.g., "wss://push.example.com/ws").
    pub endpoint: String,
    /// Cap on automatic reconnect attempts before giving up.
    pub max_retries: u32,
    /// Base backoff unit for the first reconnect attempt.
    pub initial_retry_delay: Duration,
    /// Backoff ceiling.
    pub max_retry_delay: Duration,
    /// Period between keep-alive pings while open.
    pub heartbeat_interval: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            max_retries: 5,
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(25),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection State
// ---------------------------------------------------------------------------

/// Externally observable connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport and no retry pending.
    Disconnected,
    /// Dial in progress, or a reconnect scheduled.
    Connecting,
    /// Transport established; sends go out immediately.
    Open,
    /// Torn down via `close()`. Terminal.
    Closing,
    /// Retry budget exhausted. Only an explicit `connect()` resumes.
    Failed,
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Delay before reconnect attempt `attempt` (1-based):
/// `min(initial * 2^(attempt-1), max)`.
pub(crate) fn retry_delay(config: &RealtimeConfig, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    config
        .initial_retry_delay
        .saturating_mul(factor)
        .min(config.max_retry_delay)
}
