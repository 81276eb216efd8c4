//! Wire framing: outbound directives and tolerant inbound parsing.

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Outbound Directives
// ---------------------------------------------------------------------------

/// Control directives the channel sends on its own behalf.
///
/// Application payloads passed to `send()` are serialized as-is and never
/// wrapped in this envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum Directive {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

impl Directive {
    /// Serialize to a wire frame. Directive shapes are known-serializable.
    pub(crate) fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Inbound Parsing
// ---------------------------------------------------------------------------

/// Parse a raw inbound text frame.
///
/// Malformed frames are logged and swallowed; they never reach listeners
/// and never affect connection state.
pub(crate) fn parse_inbound(raw: &str) -> Option<serde_json::Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "discarding malformed inbound frame");
            None
        }
    }
}

/// Synthetic error-typed message delivered to listeners exactly once when
/// the retry budget is exhausted.
pub(crate) fn reconnect_failed_notice(attempts: u32) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "reason": "reconnect_failed",
        "attempts": attempts,
    })
}
