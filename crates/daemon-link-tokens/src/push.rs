//! Set-semantics push-delivery registrations.

use std::sync::Arc;

use daemon_link_core::Clock;
use serde::{Deserialize, Serialize};

use crate::store::{TokenEntry, TokenStore};

/// A device's push subscription, as supplied by the client platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRegistration {
    /// Push-service endpoint URL for this device.
    pub endpoint: String,
    /// Client public key (base64), used to encrypt payloads.
    pub p256dh_b64: String,
    /// Client auth secret (base64).
    pub auth_b64: String,
}

/// Store of push-registration handles.
///
/// Unlike download tokens there is no consumption step and no TTL:
/// membership is the capability. A handle stays valid until it is
/// explicitly removed (device unregistered).
pub struct PushTokenStore {
    inner: TokenStore<PushRegistration>,
}

impl PushTokenStore {
    /// Create an empty registration store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: TokenStore::never_expiring(clock),
        }
    }

    /// Register a device, returning its opaque handle.
    pub fn register(&self, registration: PushRegistration) -> TokenEntry<PushRegistration> {
        self.inner.issue(registration)
    }

    /// Remove a registration. Idempotent.
    ///
    /// Returns whether a registration was actually removed.
    pub fn remove(&self, token: &str) -> bool {
        self.inner.remove(token)
    }

    /// Whether `token` names a live registration.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.inner.contains(token)
    }

    /// Snapshot of every registration, for fan-out delivery.
    #[must_use]
    pub fn list(&self) -> Vec<TokenEntry<PushRegistration>> {
        self.inner.entries()
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no devices are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
