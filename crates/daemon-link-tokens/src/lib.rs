//! Ephemeral capability-token stores.
//!
//! A capability token is an opaque, possession-based grant that substitutes
//! for a durable credential. This crate provides:
//! - `TokenStore` - the generic issue / consume / lazily-expire pattern
//! - `DownloadTokenStore` - time-boxed, single-use file-access grants
//! - `PushTokenStore` - unbounded-lifetime, set-semantics device registrations

pub mod download;
pub mod push;
pub mod store;

pub use download::{DownloadGrant, DownloadTokenStore};
pub use push::{PushRegistration, PushTokenStore};
pub use store::{TokenEntry, TokenStore};
