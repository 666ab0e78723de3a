//! Generic capability-token store.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use daemon_link_core::Clock;
use rand::RngCore;
use rand::rngs::OsRng;

/// Entropy per token, before base64url encoding.
const TOKEN_BYTES: usize = 32;

/// A live token as handed back to the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry<T> {
    /// Opaque unguessable token string.
    pub token: String,
    /// Caller-supplied payload, echoed back on consumption.
    pub payload: T,
    /// Unix expiry timestamp, or `None` for never-expiring stores.
    pub expires_at: Option<i64>,
}

struct Stored<T> {
    payload: T,
    expires_at: Option<i64>,
}

/// Issues, stores, consumes, and lazily expires capability tokens.
///
/// The store exclusively owns its token map. A token string, once issued,
/// maps to at most one live entry; consumption removes the entry in the
/// same locked step as validation, so two concurrent redemptions of the
/// same token cannot both succeed.
///
/// Pruning is lazy: expired entries are swept on every issuance, never by
/// a background timer. The store is bounded by active-client count rather
/// than token volume over time, so this keeps behavior deterministic
/// without leaking memory.
pub struct TokenStore<T> {
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Stored<T>>>,
}

impl<T> TokenStore<T> {
    /// Create a store whose tokens expire `ttl` after issuance.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: Some(ttl),
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store whose tokens never expire (set semantics).
    #[must_use]
    pub fn never_expiring(clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: None,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a token for `payload`.
    ///
    /// Sweeps every already-expired entry out of the store before
    /// returning.
    pub fn issue(&self, payload: T) -> TokenEntry<T>
    where
        T: Clone,
    {
        let now = self.clock.now_unix();
        let token = generate_token();
        let expires_at = self.ttl.map(|ttl| now + ttl.as_secs() as i64);

        let mut entries = self.entries.write().unwrap();
        entries.retain(|_, stored| stored.expires_at.is_none_or(|at| at > now));
        entries.insert(
            token.clone(),
            Stored {
                payload: payload.clone(),
                expires_at,
            },
        );

        TokenEntry {
            token,
            payload,
            expires_at,
        }
    }

    /// Redeem a token, at most once.
    ///
    /// The entry is removed on lookup, before its expiry is inspected, so
    /// a token can never be redeemed twice regardless of caller
    /// concurrency. An expired entry reports `None` exactly like an absent
    /// one; callers get no oracle for "was it ever valid".
    pub fn consume(&self, token: &str) -> Option<T> {
        let stored = self.entries.write().unwrap().remove(token)?;
        let live = stored.expires_at.is_none_or(|at| at > self.clock.now_unix());
        live.then_some(stored.payload)
    }

    /// Remove a token without redeeming it. Idempotent.
    ///
    /// Returns whether an entry was actually removed.
    pub fn remove(&self, token: &str) -> bool {
        self.entries.write().unwrap().remove(token).is_some()
    }

    /// Whether a live entry exists for `token`.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        let now = self.clock.now_unix();
        self.entries
            .read()
            .unwrap()
            .get(token)
            .is_some_and(|stored| stored.expires_at.is_none_or(|at| at > now))
    }

    /// Snapshot of every live entry.
    #[must_use]
    pub fn entries(&self) -> Vec<TokenEntry<T>>
    where
        T: Clone,
    {
        let now = self.clock.now_unix();
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|(_, stored)| stored.expires_at.is_none_or(|at| at > now))
            .map(|(token, stored)| TokenEntry {
                token: token.clone(),
                payload: stored.payload.clone(),
                expires_at: stored.expires_at,
            })
            .collect()
    }

    /// Number of stored entries, including any not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
