//! Token-authenticated WebSocket endpoint.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use daemon_link_auth::TokenAuthority;
use daemon_link_core::ControlMessage;
use serde::Deserialize;

/// Shared state for the channel endpoint.
#[derive(Clone)]
pub struct WsAuthState {
    /// Verifies presented bearer tokens.
    pub authority: Arc<TokenAuthority>,
}

#[derive(Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// A WebSocket handshake cannot carry per-message headers, so on the
/// direct path the token rides in the `token` query parameter and is
/// verified before the upgrade; a bad token is refused with 401 and no
/// channel ever opens. A request without a token is upgraded
/// unauthenticated and must authenticate with its first frame - that is
/// the relayed path, where the relay strips nothing and forwards the
/// client's `auth` frame through.
pub async fn ws_handler(
    Query(query): Query<WsQuery>,
    State(state): State<WsAuthState>,
    ws: WebSocketUpgrade,
) -> Response {
    match query.token {
        Some(token) => match state.authority.verify(&token) {
            Ok(claims) => {
                tracing::debug!(subject = %claims.subject, "Channel authenticated at upgrade");
                ws.on_upgrade(move |socket| handle_socket(socket, state, true))
                    .into_response()
            }
            Err(_) => StatusCode::UNAUTHORIZED.into_response(),
        },
        None => ws
            .on_upgrade(move |socket| handle_socket(socket, state, false))
            .into_response(),
    }
}

async fn handle_socket(mut socket: WebSocket, state: WsAuthState, mut authenticated: bool) {
    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        if !authenticated {
            // First frame on an unauthenticated channel must be auth.
            let verdict = match ControlMessage::from_json(&text) {
                Ok(ControlMessage::Auth { token }) => state.authority.verify(&token).is_ok(),
                _ => false,
            };
            let reply = ControlMessage::AuthResult {
                success: verdict,
                error: (!verdict).then(|| "authentication failed".to_string()),
            };
            let Ok(reply) = reply.to_json() else { break };
            if socket.send(Message::Text(reply.into())).await.is_err() {
                break;
            }
            if !verdict {
                break;
            }
            authenticated = true;
            continue;
        }

        match ControlMessage::from_json(&text) {
            Ok(ControlMessage::Ping) => {
                let Ok(pong) = ControlMessage::Pong.to_json() else {
                    break;
                };
                if socket.send(Message::Text(pong.into())).await.is_err() {
                    break;
                }
            }
            Ok(_) | Err(_) => {
                // Session frames belong to the embedding daemon, not to
                // this layer.
            }
        }
    }
}

/// Router exposing the channel endpoint at `/ws`.
#[must_use]
pub fn create_ws_router(state: WsAuthState) -> axum::Router {
    axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state)
}
