//! Control frames exchanged at channel-open time.
//!
//! Only the handshake and keepalive contract lives here. Whatever the
//! daemon streams after authentication passes through as opaque frames.

use serde::{Deserialize, Serialize};

/// Control message on a daemon channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Bearer-token handshake, sent as the first frame on a relayed
    /// channel (the relay URL cannot carry the daemon's token).
    Auth { token: String },
    /// Daemon's verdict on the handshake.
    AuthResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Keepalive.
    Ping,
    /// Keepalive response.
    Pong,
}

impl ControlMessage {
    /// Serialize to a text frame.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a text frame.
    ///
    /// # Errors
    /// Returns an error for frames that are not control messages.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
