//! Configuration schema. Every section deserializes with serde defaults so
//! a partial file only overrides what it names.

use serde::{Deserialize, Serialize};

/// Realtime channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// WebSocket endpoint URL (e.g., "wss://push.example.com/ws").
    pub endpoint: String,
    /// Reconnect attempts before giving up.
    pub max_retries: u32,
    /// Base backoff unit in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_retry_delay_ms: u64,
    /// Keep-alive period in seconds while open.
    pub heartbeat_interval_secs: u64,
    /// Channels subscribed automatically on startup.
    pub channels: Vec<String>,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            max_retries: 5,
            initial_retry_delay_ms: 1000,
            max_retry_delay_ms: 30_000,
            heartbeat_interval_secs: 25,
            channels: Vec::new(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing filter directive when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "pulselink=info".into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PulselinkConfig {
    pub realtime: RealtimeSettings,
    pub logging: LoggingSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = PulselinkConfig::default();
        assert!(config.realtime.endpoint.is_empty());
        assert_eq!(config.realtime.max_retries, 5);
        assert_eq!(config.realtime.initial_retry_delay_ms, 1000);
        assert_eq!(config.realtime.max_retry_delay_ms, 30_000);
        assert_eq!(config.realtime.heartbeat_interval_secs, 25);
        assert!(config.realtime.channels.is_empty());
        assert_eq!(config.logging.level, "pulselink=info");
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let config: PulselinkConfig = toml::from_str(
            r#"
[realtime]
endpoint = "wss://push.example.com/ws"
channels = ["system", "metrics"]
"#,
        )
        .unwrap();
        assert_eq!(config.realtime.endpoint, "wss://push.example.com/ws");
        assert_eq!(config.realtime.channels, vec!["system", "metrics"]);
        assert_eq!(config.realtime.max_retries, 5);
        assert_eq!(config.logging.level, "pulselink=info");
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let serialized = toml::to_string_pretty(&PulselinkConfig::default()).unwrap();
        let parsed: PulselinkConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.realtime.max_retries, 5);
        assert_eq!(parsed.logging.level, "pulselink=info");
    }
}
