//! Channel error types.

use thiserror::Error;

/// Failure while establishing or running one daemon channel.
///
/// Always scoped to a single channel: the manager logs these and moves
/// on, and other channels are unaffected.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Relay URL error: {0}")]
    RelayUrl(#[from] daemon_link_pairing::RelayUrlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Daemon has neither a direct address nor a relay endpoint")]
    Unreachable,
}
