//! Power polling task
//!
//! One background task per device probes liveness on a fixed interval and
//! feeds each reading into the device state, which emits a notification
//! only when the power flag actually flips.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::liveness::LivenessProbe;
use crate::notify::PowerTransition;
use crate::state::DeviceState;

/// The recurring power poll of a single device
#[derive(Debug)]
pub struct PowerPoller {
    device_id: String,

    /// Task handle for the background polling loop
    task_handle: JoinHandle<()>,

    /// Shutdown signal checked before every probe
    shutdown_signal: Arc<AtomicBool>,

    /// Total number of probes issued
    poll_count: Arc<AtomicU64>,
}

impl PowerPoller {
    /// Create and start the polling task
    ///
    /// The first probe runs immediately; later ones follow every
    /// `interval`. Each probe is awaited before the next tick, so at most
    /// one is in flight.
    pub(crate) fn start(
        state: Arc<DeviceState>,
        prober: Arc<dyn LivenessProbe>,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let poll_count = Arc::new(AtomicU64::new(0));
        let device_id = state.id().to_string();

        let task_shutdown_signal = Arc::clone(&shutdown_signal);
        let task_poll_count = Arc::clone(&poll_count);

        let task_handle = tokio::spawn(async move {
            Self::polling_loop(
                state,
                prober,
                interval,
                probe_timeout,
                task_shutdown_signal,
                task_poll_count,
            )
            .await;
        });

        Self {
            device_id,
            task_handle,
            shutdown_signal,
            poll_count,
        }
    }

    async fn polling_loop(
        state: Arc<DeviceState>,
        prober: Arc<dyn LivenessProbe>,
        interval: Duration,
        probe_timeout: Duration,
        shutdown_signal: Arc<AtomicBool>,
        poll_count: Arc<AtomicU64>,
    ) {
        info!(
            device_id = state.id(),
            interval_secs = interval.as_secs_f64(),
            "starting power polling"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if Self::should_stop(&shutdown_signal, &state) {
                break;
            }

            poll_count.fetch_add(1, Ordering::Relaxed);
            Self::poll_once(&state, prober.as_ref(), probe_timeout, &shutdown_signal).await;
        }

        debug!(device_id = state.id(), "power polling ended");
    }

    /// One probe-and-reconcile step
    ///
    /// The probe is only driven while the state is live, and a result that
    /// arrives after shutdown is discarded.
    async fn poll_once(
        state: &DeviceState,
        prober: &dyn LivenessProbe,
        probe_timeout: Duration,
        shutdown_signal: &AtomicBool,
    ) -> Option<PowerTransition> {
        let Some(address) = state.probe_address() else {
            warn!(device_id = state.id(), "no device address, skipping probe");
            return None;
        };

        let Some(outcome) = state
            .while_live(prober.probe(&address, probe_timeout))
            .await
        else {
            debug!(device_id = state.id(), "session closed, probe abandoned");
            return None;
        };

        if Self::should_stop(shutdown_signal, state) {
            debug!(device_id = state.id(), ?outcome, "session closed, discarding probe result");
            return None;
        }

        state.observe_power(outcome.is_online())
    }

    fn should_stop(shutdown_signal: &AtomicBool, state: &DeviceState) -> bool {
        shutdown_signal.load(Ordering::SeqCst) || state.is_disposed()
    }

    /// Stop polling
    ///
    /// The task is cancelled at its next await point. Disposing the device
    /// state first is what guarantees nothing acts on the device afterwards.
    pub fn stop(&self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
        self.task_handle.abort();
        info!(
            device_id = %self.device_id,
            polls = self.poll_count(),
            "stopped power polling"
        );
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown_signal.load(Ordering::SeqCst) && !self.task_handle.is_finished()
    }
}

impl Drop for PowerPoller {
    fn drop(&mut self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
        self.task_handle.abort();
    }
}
