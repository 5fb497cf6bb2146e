//! Power transition notifications
//!
//! The session reports edges only. Hosts either consume them directly
//! through a [`NotificationSink`] or route them to named triggers with a
//! [`TriggerRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A change in observed power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerTransition {
    PoweredOn,
    PoweredOff,
}

impl PowerTransition {
    /// Trigger name fired for this transition
    pub fn trigger_name(&self) -> &'static str {
        match self {
            PowerTransition::PoweredOn => "turned_on",
            PowerTransition::PoweredOff => "turned_off",
        }
    }

    /// Transition into `alive`
    pub fn into_state(alive: bool) -> Self {
        if alive {
            PowerTransition::PoweredOn
        } else {
            PowerTransition::PoweredOff
        }
    }
}

impl std::fmt::Display for PowerTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.trigger_name())
    }
}

/// Receiver of power transitions
///
/// Called from the poll task while the session's teardown is held off;
/// implementations must not block or shut the session down.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, device_id: &str, transition: PowerTransition);
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, device_id: &str, transition: PowerTransition) {
        info!(device_id, %transition, "power transition");
    }
}

/// A transition tagged with the device it happened on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerEvent {
    pub device_id: String,
    pub transition: PowerTransition,
}

/// Sink that forwards transitions over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<PowerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PowerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, device_id: &str, transition: PowerTransition) {
        let event = PowerEvent {
            device_id: device_id.to_string(),
            transition,
        };
        if self.sender.send(event).is_err() {
            warn!(device_id, %transition, "power event dropped, receiver closed");
        }
    }
}

/// Handler attached to a named trigger
pub type TriggerHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Host capability for registering named triggers
pub trait TriggerRegistry: Send + Sync {
    fn register(&self, name: &str, handler: TriggerHandler);

    /// Run every handler registered under `name` for `device_id`
    fn fire(&self, name: &str, device_id: &str);
}

/// In-process trigger registry
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<TriggerHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }
}

impl TriggerRegistry for HandlerRegistry {
    fn register(&self, name: &str, handler: TriggerHandler) {
        self.handlers
            .write()
            .entry(name.to_string())
            .or_default()
            .push(handler);
    }

    fn fire(&self, name: &str, device_id: &str) {
        // Clone out so handlers may register more handlers
        let handlers = self.handlers.read().get(name).cloned().unwrap_or_default();
        debug!(name, device_id, count = handlers.len(), "firing trigger");
        for handler in handlers {
            handler(device_id);
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("triggers", &self.handlers.read().len())
            .finish()
    }
}

/// Sink that fires `turned_on` / `turned_off` on a trigger registry
#[derive(Clone)]
pub struct TriggerSink {
    registry: Arc<dyn TriggerRegistry>,
}

impl TriggerSink {
    pub fn new(registry: Arc<dyn TriggerRegistry>) -> Self {
        Self { registry }
    }
}

impl NotificationSink for TriggerSink {
    fn notify(&self, device_id: &str, transition: PowerTransition) {
        self.registry.fire(transition.trigger_name(), device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_trigger_names() {
        assert_eq!(PowerTransition::PoweredOn.trigger_name(), "turned_on");
        assert_eq!(PowerTransition::PoweredOff.trigger_name(), "turned_off");
        assert_eq!(PowerTransition::into_state(true), PowerTransition::PoweredOn);
        assert_eq!(PowerTransition::into_state(false), PowerTransition::PoweredOff);
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.notify("tv-1", PowerTransition::PoweredOn);

        assert_eq!(
            receiver.try_recv().unwrap(),
            PowerEvent {
                device_id: "tv-1".to_string(),
                transition: PowerTransition::PoweredOn,
            }
        );
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.notify("tv-1", PowerTransition::PoweredOff);
    }

    #[test]
    fn test_trigger_sink_fires_matching_handlers() {
        let registry = Arc::new(HandlerRegistry::new());
        let on = Arc::new(AtomicUsize::new(0));
        let off = Arc::new(AtomicUsize::new(0));

        let on_count = Arc::clone(&on);
        registry.register(
            "turned_on",
            Arc::new(move |_| {
                on_count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let off_count = Arc::clone(&off);
        registry.register(
            "turned_off",
            Arc::new(move |_| {
                off_count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(registry.handler_count("turned_on"), 1);

        let sink = TriggerSink::new(registry);
        sink.notify("tv-1", PowerTransition::PoweredOn);
        sink.notify("tv-1", PowerTransition::PoweredOn);
        sink.notify("tv-1", PowerTransition::PoweredOff);

        assert_eq!(on.load(Ordering::SeqCst), 2);
        assert_eq!(off.load(Ordering::SeqCst), 1);
    }
}
