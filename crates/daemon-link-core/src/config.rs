//! Environment-driven configuration surface.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default lifetime for download tokens.
const DEFAULT_DOWNLOAD_TOKEN_TTL_SECS: u64 = 300;

/// Relay endpoint used when none is configured.
const DEFAULT_RELAY_ENDPOINT: &str = "relay.daemon-link.dev:443";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not resolve a data directory for this platform")]
    NoDataDir,
}

/// Values the core consumes but does not own.
///
/// Loaded once at startup from the environment, with defaults suitable for
/// local development. Callers embedding the crates may construct this
/// directly instead.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Lifetime of a download token from issuance to expiry.
    pub download_token_ttl: Duration,
    /// Where the bearer signing secret is persisted.
    pub secret_path: PathBuf,
    /// Relay endpoint used when a daemon is not directly reachable.
    pub relay_endpoint: String,
}

impl LinkConfig {
    /// Load configuration from the environment.
    ///
    /// Recognized variables:
    /// - `DAEMON_LINK_DOWNLOAD_TTL_SECS`
    /// - `DAEMON_LINK_SECRET_PATH`
    /// - `DAEMON_LINK_RELAY_ENDPOINT`
    ///
    /// # Errors
    /// Returns an error if no secret path is configured and the platform
    /// data directory cannot be resolved.
    pub fn from_env() -> Result<Self, ConfigError> {
        let download_ttl_secs: u64 = std::env::var("DAEMON_LINK_DOWNLOAD_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DOWNLOAD_TOKEN_TTL_SECS);

        let secret_path = match std::env::var("DAEMON_LINK_SECRET_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("daemon-link")
                .join("signing-secret"),
        };

        let relay_endpoint = std::env::var("DAEMON_LINK_RELAY_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_RELAY_ENDPOINT.to_string());

        Ok(Self {
            download_token_ttl: Duration::from_secs(download_ttl_secs),
            secret_path,
            relay_endpoint,
        })
    }
}
