//! Bearer-token issuance and verification.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use daemon_link_core::Clock;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::secret::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// Default bearer-token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default window before expiry in which a refresh is advised.
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Verification failure.
///
/// Deliberately carries no detail: callers cannot tell a bad signature
/// from a garbled payload from an expired token.
#[derive(Debug, Error)]
#[error("Authentication failed")]
pub struct AuthError;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BearerClaims {
    /// Who the token was issued to.
    pub subject: String,
    /// Issuance time, Unix seconds.
    pub issued_at: i64,
    /// Hard expiry, Unix seconds.
    pub expires_at: i64,
}

impl BearerClaims {
    /// Seconds of validity left at `now`. Negative once expired.
    #[must_use]
    pub fn remaining(&self, now: i64) -> i64 {
        self.expires_at - now
    }
}

/// Issues and verifies bearer tokens against one signing secret.
///
/// Wire format: `base64url(claims JSON) . base64url(HMAC-SHA256)`.
pub struct TokenAuthority {
    secret: SigningSecret,
    ttl: Duration,
    refresh_threshold: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    /// Create an authority with the default lifetimes.
    #[must_use]
    pub fn new(secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        Self::with_lifetimes(secret, DEFAULT_TOKEN_TTL, DEFAULT_REFRESH_THRESHOLD, clock)
    }

    /// Create an authority with explicit token TTL and refresh threshold.
    #[must_use]
    pub fn with_lifetimes(
        secret: SigningSecret,
        ttl: Duration,
        refresh_threshold: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            secret,
            ttl,
            refresh_threshold,
            clock,
        }
    }

    /// Issue a signed token for `subject`.
    ///
    /// # Panics
    /// Panics if claims serialization fails, which cannot happen for
    /// `BearerClaims`.
    pub fn issue(&self, subject: impl Into<String>) -> (String, BearerClaims) {
        let now = self.clock.now_unix();
        let claims = BearerClaims {
            subject: subject.into(),
            issued_at: now,
            expires_at: now + self.ttl.as_secs() as i64,
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims are serializable"));
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));

        (format!("{payload}.{signature}"), claims)
    }

    /// Verify a presented token and return its claims.
    ///
    /// The signature is checked before anything else; expiry is checked
    /// only after the signature proves the token was ours.
    ///
    /// # Errors
    /// Returns [`AuthError`] for any failure, without detail.
    pub fn verify(&self, token: &str) -> Result<BearerClaims, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| AuthError)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| AuthError)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError)?;

        let claims_json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| AuthError)?;
        let claims: BearerClaims = serde_json::from_slice(&claims_json).map_err(|_| AuthError)?;

        if claims.expires_at <= self.clock.now_unix() {
            return Err(AuthError);
        }
        Ok(claims)
    }

    /// Advisory: should the holder of `claims` renew its token now?
    ///
    /// True once remaining validity drops under the refresh threshold.
    /// Not enforced by [`Self::verify`]; an unexpired token stays valid
    /// whether or not it was refreshed.
    #[must_use]
    pub fn should_refresh(&self, claims: &BearerClaims) -> bool {
        claims.remaining(self.clock.now_unix()) < self.refresh_threshold.as_secs() as i64
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}
