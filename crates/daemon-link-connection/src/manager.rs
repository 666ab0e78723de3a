//! Multi-daemon connection manager.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use daemon_link_core::{DaemonId, DaemonProfile};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{error::ChannelError, registry::DaemonRegistry};

/// Opens a channel to one daemon and runs it until it closes.
///
/// The manager spawns one task per background daemon around this call
/// and aborts the task for teardown, so implementations must release
/// everything on drop.
#[async_trait]
pub trait DaemonConnector: Send + Sync + 'static {
    /// Connect to `profile` and serve the channel until it ends.
    async fn connect(&self, profile: DaemonProfile) -> Result<(), ChannelError>;
}

/// The set of daemon ids a client should hold a background channel to.
///
/// Pure function of one `(daemons, active)` snapshot: every daemon
/// flagged auto-connect, keyed by id so duplicates collapse, minus the
/// active daemon. The active daemon is excluded even when flagged -
/// it is already connected through the foreground channel, and a second
/// channel would duplicate server-side session state. An empty result
/// is a valid terminal state.
#[must_use]
pub fn background_targets(
    daemons: &[DaemonProfile],
    active: Option<&str>,
) -> BTreeSet<DaemonId> {
    let mut targets: BTreeSet<DaemonId> = daemons
        .iter()
        .filter(|d| d.auto_connect)
        .map(|d| d.id.clone())
        .collect();

    if let Some(active) = active {
        targets.remove(active);
    }
    targets
}

/// Reconciles open background channels against the derived target set.
///
/// Recomputed as a whole on every relevant state change rather than
/// tracked incrementally, so a registry mutation and an active-daemon
/// switch landing together cannot cause drift.
pub struct ConnectionManager<C: DaemonConnector> {
    registry: Arc<DaemonRegistry>,
    connector: Arc<C>,
    channels: Mutex<HashMap<DaemonId, JoinHandle<()>>>,
}

impl<C: DaemonConnector> ConnectionManager<C> {
    /// Create a manager over `registry`, opening channels with
    /// `connector`.
    #[must_use]
    pub fn new(registry: Arc<DaemonRegistry>, connector: Arc<C>) -> Self {
        Self {
            registry,
            connector,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Re-derive the background set and reconcile channels with it.
    ///
    /// Channels for daemons that left the set are aborted, releasing any
    /// in-flight handshake. Channels whose task already ended (failed or
    /// closed) are dropped and respawned here, which is the retry path
    /// for transient connection failures. A connect failure never
    /// surfaces to the caller; it is logged and the daemon is simply
    /// absent from the live set until the next recompute.
    ///
    /// Returns the target set that was reconciled against.
    pub async fn recompute(&self) -> BTreeSet<DaemonId> {
        let snapshot = self.registry.snapshot();
        let targets = background_targets(&snapshot.daemons, snapshot.active.as_deref());
        let profiles: HashMap<&str, &DaemonProfile> =
            snapshot.daemons.iter().map(|d| (d.id.as_str(), d)).collect();

        let mut channels = self.channels.lock().await;

        channels.retain(|id, handle| {
            if targets.contains(id) && !handle.is_finished() {
                return true;
            }
            handle.abort();
            tracing::debug!(daemon_id = %id, "Tearing down background channel");
            false
        });

        for id in &targets {
            if channels.contains_key(id) {
                continue;
            }
            let Some(profile) = profiles.get(id.as_str()) else {
                continue;
            };
            let profile = (*profile).clone();
            let connector = Arc::clone(&self.connector);
            let daemon_id = id.clone();

            tracing::debug!(daemon_id = %id, "Opening background channel");
            let handle = tokio::spawn(async move {
                if let Err(error) = connector.connect(profile).await {
                    tracing::warn!(
                        daemon_id = %daemon_id,
                        error = %error,
                        "Background connection failed"
                    );
                }
            });
            channels.insert(id.clone(), handle);
        }

        targets
    }

    /// Ids with a currently running channel task.
    pub async fn open_channels(&self) -> BTreeSet<DaemonId> {
        self.channels
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Abort every background channel.
    pub async fn shutdown(&self) {
        let mut channels = self.channels.lock().await;
        for (id, handle) in channels.drain() {
            handle.abort();
            tracing::debug!(daemon_id = %id, "Tearing down background channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    fn profile(id: &str, auto_connect: bool) -> DaemonProfile {
        let p = DaemonProfile::new(id, format!("ws://{id}.local:4020"));
        if auto_connect { p.with_auto_connect() } else { p }
    }

    #[test]
    fn targets_exclude_the_active_daemon() {
        let daemons = vec![profile("a", true), profile("b", false), profile("c", true)];

        let targets = background_targets(&daemons, Some("a"));
        assert_eq!(targets, BTreeSet::from(["c".to_string()]));
    }

    #[test]
    fn targets_without_active_include_every_auto_connect_daemon() {
        let daemons = vec![profile("a", true), profile("b", false), profile("c", true)];

        let targets = background_targets(&daemons, None);
        assert_eq!(targets, BTreeSet::from(["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn empty_registry_yields_empty_targets() {
        assert!(background_targets(&[], Some("a")).is_empty());
        assert!(background_targets(&[], None).is_empty());
    }

    #[test]
    fn duplicate_ids_collapse() {
        let daemons = vec![profile("a", true), profile("a", true)];
        assert_eq!(background_targets(&daemons, None).len(), 1);
    }

    #[test]
    fn unknown_active_id_changes_nothing() {
        let daemons = vec![profile("a", true)];
        let targets = background_targets(&daemons, Some("ghost"));
        assert_eq!(targets, BTreeSet::from(["a".to_string()]));
    }

    /// Connector that records calls and holds channels open forever.
    struct HangingConnector {
        connects: AsyncMutex<Vec<DaemonId>>,
    }

    impl HangingConnector {
        fn new() -> Self {
            Self {
                connects: AsyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DaemonConnector for HangingConnector {
        async fn connect(&self, profile: DaemonProfile) -> Result<(), ChannelError> {
            self.connects.lock().await.push(profile.id);
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Connector whose every attempt fails immediately.
    struct FailingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl DaemonConnector for FailingConnector {
        async fn connect(&self, _profile: DaemonProfile) -> Result<(), ChannelError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ChannelError::Unreachable)
        }
    }

    #[tokio::test]
    async fn recompute_opens_channels_for_targets_only() {
        let registry = Arc::new(DaemonRegistry::new());
        registry.upsert(profile("a", true));
        registry.upsert(profile("b", false));
        registry.upsert(profile("c", true));
        registry.set_active(Some("a".to_string()));

        let connector = Arc::new(HangingConnector::new());
        let manager = ConnectionManager::new(registry, Arc::clone(&connector));

        let targets = manager.recompute().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(targets, BTreeSet::from(["c".to_string()]));
        assert_eq!(manager.open_channels().await, targets);
        assert_eq!(*connector.connects.lock().await, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn active_switch_moves_the_background_set() {
        let registry = Arc::new(DaemonRegistry::new());
        registry.upsert(profile("a", true));
        registry.upsert(profile("c", true));
        registry.set_active(Some("a".to_string()));

        let connector = Arc::new(HangingConnector::new());
        let manager = ConnectionManager::new(Arc::clone(&registry), connector);

        assert_eq!(manager.recompute().await, BTreeSet::from(["c".to_string()]));

        registry.set_active(Some("c".to_string()));
        let targets = manager.recompute().await;

        assert_eq!(targets, BTreeSet::from(["a".to_string()]));
        assert_eq!(manager.open_channels().await, targets);
    }

    #[tokio::test]
    async fn deregistration_tears_the_channel_down() {
        let registry = Arc::new(DaemonRegistry::new());
        registry.upsert(profile("a", true));

        let connector = Arc::new(HangingConnector::new());
        let manager = ConnectionManager::new(Arc::clone(&registry), connector);

        manager.recompute().await;
        assert_eq!(manager.open_channels().await.len(), 1);

        registry.remove("a");
        manager.recompute().await;
        assert!(manager.open_channels().await.is_empty());
    }

    #[tokio::test]
    async fn one_failing_daemon_does_not_abort_the_rest() {
        let registry = Arc::new(DaemonRegistry::new());
        registry.upsert(profile("a", true));
        registry.upsert(profile("b", true));

        let connector = Arc::new(FailingConnector {
            attempts: AtomicUsize::new(0),
        });
        let manager = ConnectionManager::new(registry, Arc::clone(&connector));

        // Recompute itself never surfaces connect failures.
        let targets = manager.recompute().await;
        assert_eq!(targets.len(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

        // Failed channels are retried on the next recompute trigger.
        manager.recompute().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn shutdown_aborts_everything() {
        let registry = Arc::new(DaemonRegistry::new());
        registry.upsert(profile("a", true));
        registry.upsert(profile("b", true));

        let connector = Arc::new(HangingConnector::new());
        let manager = ConnectionManager::new(registry, connector);

        manager.recompute().await;
        assert_eq!(manager.open_channels().await.len(), 2);

        manager.shutdown().await;
        assert!(manager.open_channels().await.is_empty());
    }
}
