//! Authorization-header bearer extraction for plain request/response
//! exchanges. Channel-based connections use the query-parameter path in
//! `ws` instead.

use axum::http::{HeaderMap, StatusCode, header};
use daemon_link_auth::{BearerClaims, TokenAuthority};

/// Verify the `Authorization: Bearer <token>` header on a request.
///
/// # Errors
/// Returns 401 for a missing, malformed, or unverifiable header, with
/// no distinction between those cases.
pub fn authorize(
    headers: &HeaderMap,
    authority: &TokenAuthority,
) -> Result<BearerClaims, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    authority.verify(token).map_err(|_| StatusCode::UNAUTHORIZED)
}
