//! Daemon registry profile.

use serde::{Deserialize, Serialize};

/// Opaque stable identifier for a daemon, scoped to a local install.
///
/// Doubles as the relay session id (`serverId` on the wire), so a daemon,
/// its relay session, and any offer referencing it share one join key.
pub type DaemonId = String;

/// A known daemon, as recorded by the client's registry.
///
/// Created when a user registers or discovers a daemon, destroyed on
/// de-registration. The connection manager only ever reads a snapshot of
/// these; it does not own or mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonProfile {
    /// Stable daemon identifier.
    pub id: DaemonId,
    /// Direct WebSocket address, used when the daemon is reachable
    /// without a relay.
    pub ws_url: String,
    /// Whether the client should keep a background channel open to this
    /// daemon even when it is not the active one.
    #[serde(default)]
    pub auto_connect: bool,
}

impl DaemonProfile {
    /// Create a profile with `auto_connect` disabled.
    #[must_use]
    pub fn new(id: impl Into<DaemonId>, ws_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ws_url: ws_url.into(),
            auto_connect: false,
        }
    }

    /// Enable background auto-connect for this daemon.
    #[must_use]
    pub fn with_auto_connect(mut self) -> Self {
        self.auto_connect = true;
        self
    }
}
