//! Configuration validation. Collects every violation into a single
//! `ConfigError` instead of stopping at the first.

use crate::errors::ConfigError;
use crate::schema::PulselinkConfig;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PulselinkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    let rt = &config.realtime;
    if !rt.endpoint.is_empty()
        && !rt.endpoint.starts_with("ws://")
        && !rt.endpoint.starts_with("wss://")
    {
        errors.push(format!(
            "realtime.endpoint must use ws:// or wss://, got '{}'",
            rt.endpoint
        ));
    }
    if rt.initial_retry_delay_ms == 0 {
        errors.push("realtime.initial_retry_delay_ms must be positive".into());
    }
    if rt.max_retry_delay_ms < rt.initial_retry_delay_ms {
        errors.push(format!(
            "realtime.max_retry_delay_ms ({}) is below initial_retry_delay_ms ({})",
            rt.max_retry_delay_ms, rt.initial_retry_delay_ms
        ));
    }
    if rt.heartbeat_interval_secs == 0 {
        errors.push("realtime.heartbeat_interval_secs must be positive".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RealtimeSettings;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&PulselinkConfig::default()).is_ok());
    }

    #[test]
    fn https_endpoint_is_rejected() {
        let config = PulselinkConfig {
            realtime: RealtimeSettings {
                endpoint: "https://push.example.com/ws".into(),
                ..RealtimeSettings::default()
            },
            ..PulselinkConfig::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn ws_and_wss_endpoints_are_accepted() {
        for endpoint in ["ws://localhost:9000/ws", "wss://push.example.com/ws"] {
            let config = PulselinkConfig {
                realtime: RealtimeSettings {
                    endpoint: endpoint.into(),
                    ..RealtimeSettings::default()
                },
                ..PulselinkConfig::default()
            };
            assert!(validate(&config).is_ok(), "rejected {endpoint}");
        }
    }

    #[test]
    fn zero_delays_are_rejected() {
        let config = PulselinkConfig {
            realtime: RealtimeSettings {
                initial_retry_delay_ms: 0,
                heartbeat_interval_secs: 0,
                ..RealtimeSettings::default()
            },
            ..PulselinkConfig::default()
        };
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("initial_retry_delay_ms"));
        assert!(err.contains("heartbeat_interval_secs"));
    }

    #[test]
    fn ceiling_below_base_is_rejected() {
        let config = PulselinkConfig {
            realtime: RealtimeSettings {
                initial_retry_delay_ms: 5000,
                max_retry_delay_ms: 1000,
                ..RealtimeSettings::default()
            },
            ..PulselinkConfig::default()
        };
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("max_retry_delay_ms"));
    }

    #[test]
    fn all_violations_are_collected() {
        let config = PulselinkConfig {
            realtime: RealtimeSettings {
                endpoint: "ftp://nope".into(),
                initial_retry_delay_ms: 0,
                ..RealtimeSettings::default()
            },
            ..PulselinkConfig::default()
        };
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("endpoint"));
        assert!(err.contains("initial_retry_delay_ms"));
    }
}
