//! Registry of known daemons.

use std::{collections::HashMap, sync::RwLock};

use daemon_link_core::{DaemonId, DaemonProfile};

/// One consistent view of `(daemons, active)`.
///
/// The connection manager derives its background set from a snapshot,
/// never from the live registry, so a recompute can never observe a
/// half-applied mutation.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Every known daemon profile.
    pub daemons: Vec<DaemonProfile>,
    /// The daemon currently in the foreground, if any.
    pub active: Option<DaemonId>,
}

struct State {
    daemons: HashMap<DaemonId, DaemonProfile>,
    active: Option<DaemonId>,
}

/// Mutable registry of daemon profiles plus the active-daemon pointer.
pub struct DaemonRegistry {
    state: RwLock<State>,
}

impl DaemonRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                daemons: HashMap::new(),
                active: None,
            }),
        }
    }

    /// Insert or replace a profile, keyed by its id.
    pub fn upsert(&self, profile: DaemonProfile) {
        let mut state = self.state.write().unwrap();
        state.daemons.insert(profile.id.clone(), profile);
    }

    /// De-register a daemon. Clears the active pointer if it pointed at
    /// the removed daemon.
    ///
    /// Returns whether a profile was actually removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.write().unwrap();
        let removed = state.daemons.remove(id).is_some();
        if removed && state.active.as_deref() == Some(id) {
            state.active = None;
        }
        removed
    }

    /// Point the foreground at a daemon, or clear it with `None`.
    ///
    /// The id does not have to resolve to a known profile; an unknown
    /// active id simply has no effect on the derived background set.
    pub fn set_active(&self, id: Option<DaemonId>) {
        self.state.write().unwrap().active = id;
    }

    /// Fetch one profile by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<DaemonProfile> {
        self.state.read().unwrap().daemons.get(id).cloned()
    }

    /// Take a consistent snapshot of daemons and the active pointer.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().unwrap();
        RegistrySnapshot {
            daemons: state.daemons.values().cloned().collect(),
            active: state.active.clone(),
        }
    }
}

impl Default for DaemonRegistry {
    fn default() -> Self {
        Self::new()
    }
}
