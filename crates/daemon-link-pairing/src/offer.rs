//! Connection-offer payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The offer version this build understands.
pub const OFFER_VERSION: i64 = 2;

/// Offer validation failure.
///
/// Malformed JSON, an unknown version, and a missing/empty field are
/// three distinct failures; consumers surface them differently during
/// pairing.
#[derive(Debug, Error)]
pub enum OfferError {
    #[error("Malformed offer payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unsupported offer version {0}")]
    UnsupportedVersion(i64),
    #[error("Offer field `{0}` is missing or empty")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOffer {
    #[serde(default)]
    v: Option<i64>,
    #[serde(default)]
    server_id: Option<String>,
    #[serde(default)]
    daemon_public_key_b64: Option<String>,
    #[serde(default)]
    relay: Option<RawRelay>,
}

#[derive(Deserialize)]
struct RawRelay {
    #[serde(default)]
    endpoint: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOffer<'a> {
    v: i64,
    server_id: &'a str,
    daemon_public_key_b64: &'a str,
    relay: WireRelay<'a>,
}

#[derive(Serialize)]
struct WireRelay<'a> {
    endpoint: &'a str,
}

/// A validated v2 connection offer.
///
/// Describes how a client reaches a daemon: the daemon's public key for
/// the direct path and the relay endpoint for when direct reachability
/// is unavailable. Instances exist only on the far side of
/// [`ConnectionOffer::from_json`] or [`ConnectionOffer::new`], so
/// downstream code treats the shape as a proven invariant. Offers are
/// single-use inputs to a connection attempt; nothing in this layer
/// persists them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOffer {
    server_id: String,
    daemon_public_key_b64: String,
    relay_endpoint: String,
}

impl ConnectionOffer {
    /// Build an offer from its parts, rejecting empty fields.
    ///
    /// # Errors
    /// Returns [`OfferError::MissingField`] for any empty part.
    pub fn new(
        server_id: impl Into<String>,
        daemon_public_key_b64: impl Into<String>,
        relay_endpoint: impl Into<String>,
    ) -> Result<Self, OfferError> {
        let offer = Self {
            server_id: server_id.into(),
            daemon_public_key_b64: daemon_public_key_b64.into(),
            relay_endpoint: relay_endpoint.into(),
        };
        if offer.server_id.is_empty() {
            return Err(OfferError::MissingField("serverId"));
        }
        if offer.daemon_public_key_b64.is_empty() {
            return Err(OfferError::MissingField("daemonPublicKeyB64"));
        }
        if offer.relay_endpoint.is_empty() {
            return Err(OfferError::MissingField("relay.endpoint"));
        }
        Ok(offer)
    }

    /// Parse and validate an incoming offer.
    ///
    /// # Errors
    /// - [`OfferError::Malformed`] when `json` is not a JSON object
    /// - [`OfferError::UnsupportedVersion`] when `v` is present but not 2
    /// - [`OfferError::MissingField`] when a required field is absent or
    ///   empty
    pub fn from_json(json: &str) -> Result<Self, OfferError> {
        let raw: RawOffer = serde_json::from_str(json)?;

        let version = raw.v.ok_or(OfferError::MissingField("v"))?;
        if version != OFFER_VERSION {
            return Err(OfferError::UnsupportedVersion(version));
        }

        let server_id = raw
            .server_id
            .filter(|s| !s.is_empty())
            .ok_or(OfferError::MissingField("serverId"))?;
        let daemon_public_key_b64 = raw
            .daemon_public_key_b64
            .filter(|s| !s.is_empty())
            .ok_or(OfferError::MissingField("daemonPublicKeyB64"))?;
        let relay_endpoint = raw
            .relay
            .and_then(|r| r.endpoint)
            .filter(|s| !s.is_empty())
            .ok_or(OfferError::MissingField("relay.endpoint"))?;

        Ok(Self {
            server_id,
            daemon_public_key_b64,
            relay_endpoint,
        })
    }

    /// Serialize to the wire shape.
    ///
    /// # Panics
    /// Panics if serialization fails, which cannot happen for this shape.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&WireOffer {
            v: OFFER_VERSION,
            server_id: &self.server_id,
            daemon_public_key_b64: &self.daemon_public_key_b64,
            relay: WireRelay {
                endpoint: &self.relay_endpoint,
            },
        })
        .expect("offer wire shape is serializable")
    }

    /// The daemon's durable identifier, also its relay session key.
    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The daemon's public key, base64 encoded.
    #[must_use]
    pub fn daemon_public_key_b64(&self) -> &str {
        &self.daemon_public_key_b64
    }

    /// The relay endpoint through which the daemon is reachable.
    #[must_use]
    pub fn relay_endpoint(&self) -> &str {
        &self.relay_endpoint
    }
}
