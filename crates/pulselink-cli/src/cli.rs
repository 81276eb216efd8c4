use clap::Parser;

/// Pulselink: tail and publish on a realtime update channel.
#[derive(Parser, Debug)]
#[command(name = "pulselink", version, about)]
pub struct Args {
    /// WebSocket endpoint (defaults to the configured realtime.endpoint).
    pub endpoint: Option<String>,

    /// Subscribe to a channel on startup. Repeatable.
    #[arg(short = 'c', long = "channel")]
    pub channels: Vec<String>,

    /// JSON payload to send once; queued until the connection opens.
    #[arg(long)]
    pub send: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
