//! Daemon-side transport surface.
//!
//! Two routes, both capability-gated:
//! - `/ws` - channel endpoint; the bearer token arrives as a connection
//!   query parameter (direct path) or as the first frame (relayed path)
//! - `/files/download` - redeems a download token exactly once
//!
//! Plain request/response routes belong to the embedding daemon; they
//! gate themselves with [`headers::authorize`].

pub mod download;
pub mod headers;
pub mod ws;

pub use download::{DownloadState, create_download_router};
pub use headers::authorize;
pub use ws::{WsAuthState, create_ws_router};
