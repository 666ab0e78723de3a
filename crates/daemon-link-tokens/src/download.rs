//! Time-boxed, single-use file-download grants.

use std::{path::PathBuf, sync::Arc, time::Duration};

use daemon_link_core::Clock;
use serde::{Deserialize, Serialize};

use crate::store::{TokenEntry, TokenStore};

/// What a download token grants access to.
///
/// Echoed back to the redeemer exactly once, on successful consumption.
/// Grants are never listable after issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadGrant {
    /// Agent session that owns the file.
    pub agent_id: String,
    /// Absolute path of the file on the daemon host.
    pub path: PathBuf,
    /// MIME type to serve the file as.
    pub mime_type: String,
    /// File size in bytes, as known at issuance.
    pub byte_size: u64,
}

/// Store of single-use download tokens.
pub struct DownloadTokenStore {
    inner: TokenStore<DownloadGrant>,
}

impl DownloadTokenStore {
    /// Create a store whose tokens live for `ttl` after issuance.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TokenStore::new(ttl, clock),
        }
    }

    /// Issue a download token for `grant`.
    pub fn issue(&self, grant: DownloadGrant) -> TokenEntry<DownloadGrant> {
        self.inner.issue(grant)
    }

    /// Redeem a download token, at most once.
    ///
    /// Absent, already-consumed, and expired tokens are indistinguishable.
    pub fn consume(&self, token: &str) -> Option<DownloadGrant> {
        self.inner.consume(token)
    }

    /// Number of outstanding grants, including any not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no grants are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daemon_link_core::FixedClock;

    fn grant() -> DownloadGrant {
        DownloadGrant {
            agent_id: "agent-1".to_string(),
            path: PathBuf::from("/tmp/out/report.pdf"),
            mime_type: "application/pdf".to_string(),
            byte_size: 4096,
        }
    }

    #[test]
    fn grant_round_trips_through_consumption() {
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let store = DownloadTokenStore::new(Duration::from_secs(300), clock);

        let entry = store.issue(grant());
        let redeemed = store.consume(&entry.token).unwrap();

        assert_eq!(redeemed, grant());
        assert_eq!(store.consume(&entry.token), None);
    }

    #[test]
    fn expired_grant_is_not_redeemable() {
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let store = DownloadTokenStore::new(Duration::from_secs(300), clock.clone());

        let entry = store.issue(grant());
        clock.advance(301);

        assert_eq!(store.consume(&entry.token), None);
    }

    #[test]
    fn grant_serializes_camel_case() {
        let json = serde_json::to_string(&grant()).unwrap();
        assert!(json.contains("\"agentId\""));
        assert!(json.contains("\"mimeType\""));
        assert!(json.contains("\"byteSize\""));
    }
}
