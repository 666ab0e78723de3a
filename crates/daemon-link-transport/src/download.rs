//! Single-use download-token redemption.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use daemon_link_tokens::DownloadTokenStore;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

/// Shared state for the download endpoint.
#[derive(Clone)]
pub struct DownloadState {
    /// Store the tokens were issued from.
    pub store: Arc<DownloadTokenStore>,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    token: Option<String>,
}

/// Redeem a download token and serve the granted file.
///
/// Everything that is not a live token - absent parameter, unknown
/// token, already consumed, expired - answers 404. The token is
/// consumed before the file is read, so a second request races nothing:
/// it sees 404 no matter how the first one ended.
pub async fn download_handler(
    Query(query): Query<DownloadQuery>,
    State(state): State<DownloadState>,
) -> Response {
    let Some(token) = query.token else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(grant) = state.store.consume(&token) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&grant.path).await {
        Ok(bytes) => {
            tracing::debug!(
                agent_id = %grant.agent_id,
                path = %grant.path.display(),
                byte_size = bytes.len(),
                "Serving download grant"
            );
            ([(header::CONTENT_TYPE, grant.mime_type)], bytes).into_response()
        }
        Err(error) => {
            tracing::warn!(
                agent_id = %grant.agent_id,
                path = %grant.path.display(),
                error = %error,
                "Granted file is unreadable"
            );
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Router exposing token redemption at `/files/download`.
///
/// CORS is permissive: download links are handed to clients on other
/// origins, and the token itself is the access control.
#[must_use]
pub fn create_download_router(state: DownloadState) -> axum::Router {
    axum::Router::new()
        .route("/files/download", axum::routing::get(download_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
