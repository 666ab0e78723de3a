//! One daemon channel over a direct or relayed WebSocket.

use async_trait::async_trait;
use daemon_link_core::{ControlMessage, DaemonId, DaemonProfile};
use daemon_link_pairing::{RelayConnectionParams, RelayRole, build_relay_url};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, interval};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{error::ChannelError, manager::DaemonConnector};

/// Channel tuning knobs.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Keepalive interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Base reconnect delay in seconds.
    pub reconnect_base_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub reconnect_max_delay_secs: u64,
    /// Consecutive failed attempts before the channel gives up.
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            reconnect_base_delay_secs: 2,
            reconnect_max_delay_secs: 30,
            max_reconnect_attempts: 10,
        }
    }
}

/// Observable channel lifecycle.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Channel established and, where applicable, authenticated.
    Connected(DaemonId),
    /// Channel closed.
    Disconnected(DaemonId),
    /// Opaque daemon frame, passed through untouched.
    Frame(DaemonId, String),
}

/// Connects to a daemon directly when it has an address, through the
/// relay otherwise.
///
/// On the direct path the bearer token rides in the connection URL,
/// since a WebSocket handshake cannot carry per-message headers. On the
/// relayed path the token is instead the first frame after the socket
/// opens, and the daemon's verdict completes the handshake.
pub struct RelayChannel {
    config: ChannelConfig,
    relay_endpoint: String,
    bearer_token: String,
    events: broadcast::Sender<ChannelEvent>,
}

impl RelayChannel {
    /// Create a channel factory with default tuning.
    #[must_use]
    pub fn new(relay_endpoint: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self::with_config(relay_endpoint, bearer_token, ChannelConfig::default())
    }

    /// Create a channel factory with explicit tuning.
    #[must_use]
    pub fn with_config(
        relay_endpoint: impl Into<String>,
        bearer_token: impl Into<String>,
        config: ChannelConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(128);
        Self {
            config,
            relay_endpoint: relay_endpoint.into(),
            bearer_token: bearer_token.into(),
            events,
        }
    }

    /// Subscribe to lifecycle events across every channel this factory
    /// runs.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Resolve the URL for one attempt. The second value says whether a
    /// first-frame auth handshake is still owed after the socket opens.
    fn connection_url(&self, profile: &DaemonProfile) -> Result<(String, bool), ChannelError> {
        if !profile.ws_url.is_empty() {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("token", &self.bearer_token);
            let base = profile.ws_url.trim_end_matches('/');
            return Ok((format!("{base}?{}", query.finish()), false));
        }

        if !self.relay_endpoint.is_empty() {
            let params = RelayConnectionParams {
                endpoint: self.relay_endpoint.clone(),
                server_id: profile.id.clone(),
                role: RelayRole::Client,
                version: None,
                client_session_key: Some(uuid::Uuid::new_v4().to_string()),
            };
            return Ok((build_relay_url(&params)?, true));
        }

        Err(ChannelError::Unreachable)
    }

    /// Run one connection from dial to close.
    ///
    /// Zeroes `attempts` once the channel is established, so the backoff
    /// in [`DaemonConnector::connect`] only counts consecutive failures.
    async fn run_once(
        &self,
        profile: &DaemonProfile,
        attempts: &mut u32,
    ) -> Result<(), ChannelError> {
        let (url, relayed) = self.connection_url(profile)?;
        debug!(daemon_id = %profile.id, relayed, "Connecting to daemon");

        let (ws, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws.split();

        if relayed {
            let auth = ControlMessage::Auth {
                token: self.bearer_token.clone(),
            }
            .to_json()?;
            write.send(Message::Text(auth.into())).await?;

            let reply = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => break text,
                    Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(ChannelError::Handshake(
                            "channel closed during handshake".to_string(),
                        ));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => return Err(error.into()),
                }
            };

            match ControlMessage::from_json(&reply) {
                Ok(ControlMessage::AuthResult { success: true, .. }) => {}
                Ok(ControlMessage::AuthResult { error, .. }) => {
                    return Err(ChannelError::Handshake(
                        error.unwrap_or_else(|| "token rejected".to_string()),
                    ));
                }
                _ => {
                    return Err(ChannelError::Handshake(
                        "unexpected handshake reply".to_string(),
                    ));
                }
            }
        }

        *attempts = 0;
        info!(daemon_id = %profile.id, relayed, "Channel established");
        let _ = self.events.send(ChannelEvent::Connected(profile.id.clone()));

        let (out_tx, mut out_rx) = mpsc::channel::<Message>(16);

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let heartbeat_tx = out_tx.clone();
        let heartbeat_secs = self.config.heartbeat_interval_secs;
        let heartbeat = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(heartbeat_secs));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Ok(ping) = ControlMessage::Ping.to_json() else {
                    break;
                };
                if heartbeat_tx.send(Message::Text(ping.into())).await.is_err() {
                    break;
                }
            }
        });

        let result = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match ControlMessage::from_json(&text) {
                    Ok(ControlMessage::Ping) => {
                        if let Ok(pong) = ControlMessage::Pong.to_json() {
                            let _ = out_tx.send(Message::Text(pong.into())).await;
                        }
                    }
                    Ok(ControlMessage::Pong) => {}
                    Ok(other) => {
                        debug!(daemon_id = %profile.id, frame = ?other, "Unexpected control frame");
                    }
                    Err(_) => {
                        let _ = self
                            .events
                            .send(ChannelEvent::Frame(profile.id.clone(), text.to_string()));
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = out_tx.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(error)) => break Err(ChannelError::from(error)),
            }
        };

        heartbeat.abort();
        writer.abort();
        let _ = self
            .events
            .send(ChannelEvent::Disconnected(profile.id.clone()));
        result
    }
}

#[async_trait]
impl DaemonConnector for RelayChannel {
    async fn connect(&self, profile: DaemonProfile) -> Result<(), ChannelError> {
        let mut attempts: u32 = 0;
        loop {
            match self.run_once(&profile, &mut attempts).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    attempts += 1;
                    if attempts > self.config.max_reconnect_attempts {
                        return Err(error);
                    }
                    let delay = std::cmp::min(
                        self.config.reconnect_base_delay_secs * 2u64.pow(attempts - 1),
                        self.config.reconnect_max_delay_secs,
                    );
                    warn!(
                        daemon_id = %profile.id,
                        error = %error,
                        attempt = attempts,
                        delay_secs = delay,
                        "Channel attempt failed; backing off"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
            }
        }
    }
}
