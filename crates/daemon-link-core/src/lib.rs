//! Shared building blocks for the daemon-link workspace.
//!
//! This crate provides the leaf types every other crate depends on:
//! - `Clock` - injectable time source for deterministic expiry
//! - `DaemonProfile` - registry snapshot data for a known daemon
//! - `ControlMessage` - handshake/keepalive frames both channel ends speak
//! - `LinkConfig` - environment-driven configuration surface

pub mod clock;
pub mod config;
pub mod control;
pub mod profile;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LinkConfig;
pub use control::ControlMessage;
pub use profile::{DaemonId, DaemonProfile};
