//! Pairing protocol between a client and a daemon it reaches via a relay.
//!
//! - `ConnectionOffer` - the versioned payload exchanged once during
//!   pairing, validated strictly at the boundary
//! - `RelayProtocolVersion` / `build_relay_url` - deterministic
//!   construction of the relay WebSocket endpoint

pub mod offer;
pub mod relay_url;

pub use offer::{ConnectionOffer, OfferError};
pub use relay_url::{
    RelayConnectionParams, RelayProtocolVersion, RelayRole, RelayUrlError, build_relay_url,
};
