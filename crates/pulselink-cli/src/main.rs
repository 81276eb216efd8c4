mod cli;

use std::path::Path;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use pulselink_config::PulselinkConfig;
use pulselink_realtime::{RealtimeChannel, RealtimeConfig};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Config is loaded before logging is initialized so the configured
    // level can seed the filter; load problems surface on stderr.
    let config = match &args.config {
        Some(path) => pulselink_config::load_from_path(Path::new(path)),
        None => pulselink_config::load_config(),
    }
    .unwrap_or_else(|e| {
        eprintln!("config load failed, using defaults: {e}");
        PulselinkConfig::default()
    });

    let directive = args.log_level.as_deref().unwrap_or(&config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| "pulselink=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("pulselink v{} starting", env!("CARGO_PKG_VERSION"));

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.realtime.endpoint.clone());
    if endpoint.is_empty() {
        tracing::error!("no endpoint; pass one as an argument or set realtime.endpoint");
        std::process::exit(2);
    }

    let realtime = RealtimeConfig {
        endpoint,
        max_retries: config.realtime.max_retries,
        initial_retry_delay: Duration::from_millis(config.realtime.initial_retry_delay_ms),
        max_retry_delay: Duration::from_millis(config.realtime.max_retry_delay_ms),
        heartbeat_interval: Duration::from_secs(config.realtime.heartbeat_interval_secs),
    };

    // The channel is owned here and torn down on shutdown, not shared as
    // process-global state.
    let channel = RealtimeChannel::new(realtime);

    // One JSON line per inbound message.
    let _listener = channel.on_message(|message| {
        println!("{message}");
    });

    let mut state_rx = channel.state_changes();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow();
            tracing::info!(?state, "connection state");
        }
    });

    channel.connect();

    for topic in config.realtime.channels.iter().chain(args.channels.iter()) {
        channel.subscribe(topic.as_str());
    }

    if let Some(raw) = &args.send {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(payload) => channel.send(payload),
            Err(e) => {
                tracing::error!(error = %e, "--send payload is not valid JSON");
                std::process::exit(2);
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to wait for shutdown signal");
    }
    channel.close();
    tracing::info!("shutdown complete");
}
