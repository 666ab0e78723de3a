//! Background-connection management for known daemons.
//!
//! A client typically knows several daemons but only one is in the
//! foreground at a time. This crate decides which of the others deserve
//! a live background channel and keeps those channels open:
//! - `DaemonRegistry` - consistent snapshots of known daemons
//! - `background_targets` - pure derivation of the background set
//! - `ConnectionManager` - reconciles open channels against that set
//! - `RelayChannel` - one channel implementation: direct WebSocket when
//!   the daemon is reachable, relayed otherwise

pub mod channel;
pub mod error;
pub mod manager;
pub mod registry;

pub use channel::{ChannelConfig, ChannelEvent, RelayChannel};
pub use error::ChannelError;
pub use manager::{ConnectionManager, DaemonConnector, background_targets};
pub use registry::{DaemonRegistry, RegistrySnapshot};
