//! State shared between a session handle and its poll task

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bravia_api::{Endpoint, ResolvedSettings};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::notify::{NotificationSink, PowerTransition};
use crate::settings::{DeviceConfig, SettingsStore};

/// Settings, persistence and notification plumbing of one device
///
/// Settings become `None` once the session is disposed; every mutation
/// after that point is ignored.
///
/// `gate` serialises disposal against the steps that act on the device:
/// polling a probe, and the check-persist-notify of a power edge. Once
/// `dispose` returns, neither runs again.
pub(crate) struct DeviceState {
    id: String,
    settings: RwLock<Option<DeviceConfig>>,
    store: Arc<dyn SettingsStore>,
    sink: Arc<dyn NotificationSink>,
    gate: Mutex<()>,
    disposed: AtomicBool,
}

impl DeviceState {
    pub(crate) fn new(
        settings: DeviceConfig,
        store: Arc<dyn SettingsStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            id: settings.id.clone(),
            settings: RwLock::new(Some(settings)),
            store,
            sink,
            gate: Mutex::new(()),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn snapshot(&self) -> Option<DeviceConfig> {
        self.settings.read().clone()
    }

    pub(crate) fn resolved(&self) -> Option<ResolvedSettings> {
        self.settings.read().as_ref()?.resolved()
    }

    /// Trimmed address for the next probe
    pub(crate) fn probe_address(&self) -> Option<String> {
        self.settings.read().as_ref()?.address().map(str::to_string)
    }

    pub(crate) fn power(&self) -> bool {
        self.settings.read().as_ref().is_some_and(|s| s.power)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Mark disposed and drop the settings
    ///
    /// Blocks until an in-progress probe poll or power edge has finished.
    pub(crate) fn dispose(&self) {
        let _gate = self.gate.lock();
        self.disposed.store(true, Ordering::SeqCst);
        self.settings.write().take();
    }

    /// Drive `future` only while the state is live
    ///
    /// Every poll happens under the gate. Resolves to `None`, dropping
    /// `future`, at the first poll after disposal.
    pub(crate) async fn while_live<F: Future>(&self, future: F) -> Option<F::Output> {
        let mut future = std::pin::pin!(future);
        std::future::poll_fn(|cx| {
            let _gate = self.gate.lock();
            if self.is_disposed() {
                return std::task::Poll::Ready(None);
            }
            future.as_mut().poll(cx).map(Some)
        })
        .await
    }

    /// Record and persist a resolved endpoint
    pub(crate) fn set_endpoint(&self, endpoint: Endpoint) {
        let _gate = self.gate.lock();
        let updated = {
            let mut guard = self.settings.write();
            let Some(settings) = guard.as_mut() else {
                return;
            };
            settings.api_endpoint = Some(endpoint);
            settings.clone()
        };
        self.persist(&updated);
    }

    /// Clear the cached endpoint so the next resolution re-derives it
    pub(crate) fn clear_endpoint(&self) {
        if let Some(settings) = self.settings.write().as_mut() {
            settings.api_endpoint = None;
        }
    }

    /// Reconcile an observation with the stored power flag
    ///
    /// On a change the new flag is persisted first, then exactly one
    /// transition is emitted. A steady state writes and emits nothing.
    /// The whole step holds the gate, so the sink must not dispose this
    /// state from inside `notify`.
    pub(crate) fn observe_power(&self, alive: bool) -> Option<PowerTransition> {
        let _gate = self.gate.lock();
        if self.is_disposed() {
            return None;
        }

        let updated = {
            let mut guard = self.settings.write();
            let settings = guard.as_mut()?;
            if settings.power == alive {
                return None;
            }
            settings.power = alive;
            settings.clone()
        };

        self.persist(&updated);

        let transition = PowerTransition::into_state(alive);
        info!(device = updated.label(), %transition, "power state changed");
        self.sink.notify(&self.id, transition);
        Some(transition)
    }

    fn persist(&self, settings: &DeviceConfig) {
        if let Err(e) = self.store.save(settings) {
            warn!(device_id = %self.id, error = %e, "failed to persist device settings");
        }
    }
}

impl std::fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceState")
            .field("id", &self.id)
            .field("settings", &*self.settings.read())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelSink, PowerEvent};
    use crate::settings::MemorySettingsStore;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn state_with(
        power: bool,
    ) -> (DeviceState, Arc<MemorySettingsStore>, UnboundedReceiver<PowerEvent>) {
        let store = Arc::new(MemorySettingsStore::new());
        let (sink, receiver) = ChannelSink::new();
        let mut config = DeviceConfig::new("tv-1", "10.0.0.5");
        config.power = power;
        let state = DeviceState::new(config, store.clone(), Arc::new(sink));
        (state, store, receiver)
    }

    #[test]
    fn test_steady_state_writes_nothing() {
        let (state, store, mut receiver) = state_with(false);

        assert_eq!(state.observe_power(false), None);
        assert!(store.get("tv-1").is_none());
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_transition_persists_then_notifies() {
        let (state, store, mut receiver) = state_with(false);

        assert_eq!(state.observe_power(true), Some(PowerTransition::PoweredOn));
        assert!(store.get("tv-1").unwrap().power);
        assert_eq!(
            receiver.try_recv().unwrap().transition,
            PowerTransition::PoweredOn
        );
        assert!(state.power());
    }

    #[test]
    fn test_disposed_state_ignores_observations() {
        let (state, store, mut receiver) = state_with(false);
        state.dispose();

        assert!(state.is_disposed());
        assert_eq!(state.observe_power(true), None);
        assert!(state.snapshot().is_none());
        assert!(state.resolved().is_none());
        assert!(store.get("tv-1").is_none());
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_while_live_drives_future() {
        let (state, _store, _receiver) = state_with(false);
        assert_eq!(state.while_live(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_while_live_never_polls_after_dispose() {
        let (state, _store, _receiver) = state_with(false);
        let polled = AtomicBool::new(false);
        state.dispose();

        let result = state
            .while_live(async {
                polled.store(true, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result, None);
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_endpoint_set_and_clear() {
        let (state, store, _receiver) = state_with(false);

        state.set_endpoint(Endpoint::Sony);
        assert_eq!(state.resolved().unwrap().endpoint(), Endpoint::Sony);
        assert_eq!(store.get("tv-1").unwrap().api_endpoint, Some(Endpoint::Sony));

        state.clear_endpoint();
        assert!(state.resolved().is_none());
    }
}
