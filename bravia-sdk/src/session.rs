//! Device session: the lifetime of one paired television
//!
//! A session merges the host-supplied settings with whatever was persisted
//! for the device, resolves the control endpoint once, then keeps a power
//! poll running until it is shut down or dropped.

use std::sync::Arc;

use bravia_api::{
    CommandCode, CommandError, CommandTable, Endpoint, IrccClient, IrccTransport, RemoteAction,
    SoapClient,
};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SdkError};
use crate::liveness::{LivenessProbe, TcpLivenessProbe};
use crate::notify::{LogSink, NotificationSink, TriggerRegistry, TriggerSink};
use crate::poller::PowerPoller;
use crate::settings::{DeviceConfig, MemorySettingsStore, SettingsStore};
use crate::state::DeviceState;

/// A running session for one device
///
/// # Example
///
/// ```rust,no_run
/// use bravia_sdk::{DeviceConfig, DeviceSession, JsonFileSettingsStore};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), bravia_sdk::SdkError> {
/// let store = Arc::new(JsonFileSettingsStore::in_config_dir()?);
/// let session = DeviceSession::builder(DeviceConfig::new("living-room", "192.168.1.20"))
///     .with_store(store)
///     .start()
///     .await?;
///
/// println!("powered: {}", session.power());
/// session.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct DeviceSession {
    state: Arc<DeviceState>,
    client: IrccClient,
    poller: Mutex<Option<PowerPoller>>,
    config: SessionConfig,
}

impl DeviceSession {
    pub fn builder(settings: DeviceConfig) -> DeviceSessionBuilder {
        DeviceSessionBuilder::new(settings)
    }

    pub fn id(&self) -> &str {
        self.state.id()
    }

    /// Current settings, `None` after shutdown
    pub fn settings(&self) -> Option<DeviceConfig> {
        self.state.snapshot()
    }

    /// Last observed power state
    pub fn power(&self) -> bool {
        self.state.power()
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.state.snapshot()?.api_endpoint
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_disposed()
    }

    /// Send one command code to this device
    ///
    /// After shutdown this fails with `SettingsUnavailable` without any I/O.
    pub async fn send_command(&self, code: &CommandCode) -> std::result::Result<(), CommandError> {
        let settings = self.state.resolved();
        self.client.send_command(settings.as_ref(), code).await
    }

    /// Look up `action` in `table` and send its code
    pub async fn send_action(&self, action: RemoteAction, table: &CommandTable) -> Result<()> {
        let code = table.code_for(action)?;
        debug!(device_id = self.id(), action = action.name(), "sending action");
        self.send_command(code).await?;
        Ok(())
    }

    /// Forget the cached endpoint and resolve it again
    pub async fn reresolve_endpoint(&self) -> Result<Endpoint> {
        if self.state.is_disposed() {
            return Err(SdkError::SessionClosed);
        }

        self.state.clear_endpoint();
        let address = self
            .state
            .probe_address()
            .ok_or_else(|| SdkError::MissingAddress(self.id().to_string()))?;

        let endpoint = self.client.resolve_endpoint(&address).await;
        if self.state.is_disposed() {
            return Err(SdkError::SessionClosed);
        }

        self.state.set_endpoint(endpoint);
        Ok(endpoint)
    }

    /// Stop polling and release the device settings
    ///
    /// Idempotent. Waits for a probe poll or power edge already in progress;
    /// once this returns no probe is driven and no transition is emitted.
    pub fn shutdown(&self) {
        self.state.dispose();
        if let Some(poller) = self.poller.lock().take() {
            poller.stop();
            info!(device_id = self.id(), "device session closed");
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Builder for [`DeviceSession`]
///
/// Every collaborator has an in-process or network default, so only the
/// fresh settings are required.
pub struct DeviceSessionBuilder {
    settings: DeviceConfig,
    config: SessionConfig,
    store: Option<Arc<dyn SettingsStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
    transport: Option<Arc<dyn IrccTransport>>,
    prober: Option<Arc<dyn LivenessProbe>>,
}

impl DeviceSessionBuilder {
    pub fn new(settings: DeviceConfig) -> Self {
        Self {
            settings,
            config: SessionConfig::default(),
            store: None,
            sink: None,
            transport: None,
            prober: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Fire `turned_on` / `turned_off` on `registry`
    pub fn with_trigger_registry(self, registry: Arc<dyn TriggerRegistry>) -> Self {
        self.with_sink(Arc::new(TriggerSink::new(registry)))
    }

    pub fn with_transport(mut self, transport: Arc<dyn IrccTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn LivenessProbe>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Merge and persist settings, resolve the endpoint if needed, and
    /// start the power poll
    pub async fn start(self) -> Result<DeviceSession> {
        let DeviceSessionBuilder {
            settings,
            config,
            store,
            sink,
            transport,
            prober,
        } = self;

        config.validate()?;

        let store: Arc<dyn SettingsStore> = match store {
            Some(store) => store,
            None => Arc::new(MemorySettingsStore::new()),
        };
        let sink: Arc<dyn NotificationSink> = match sink {
            Some(sink) => sink,
            None => Arc::new(LogSink),
        };
        let transport: Arc<dyn IrccTransport> = match transport {
            Some(transport) => transport,
            None => Arc::new(SoapClient::new()),
        };
        let prober: Arc<dyn LivenessProbe> = match prober {
            Some(prober) => prober,
            None => Arc::new(TcpLivenessProbe::with_port(config.probe_port)),
        };

        let persisted = store.load(&settings.id)?;
        let merged = settings.merged_with(persisted.as_ref());
        let Some(address) = merged.address().map(str::to_string) else {
            return Err(SdkError::MissingAddress(merged.id));
        };
        store.save(&merged)?;

        info!(
            device_id = %merged.id,
            device = merged.label(),
            ip = %address,
            endpoint = ?merged.api_endpoint,
            power = merged.power,
            "starting device session"
        );

        let client = IrccClient::with_transport(transport)
            .with_command_timeout(config.command_timeout)
            .with_resolve_timeout(config.resolve_timeout);

        let needs_endpoint = merged.api_endpoint.is_none();
        let state = Arc::new(DeviceState::new(merged, store, sink));

        if needs_endpoint {
            let endpoint = client.resolve_endpoint(&address).await;
            state.set_endpoint(endpoint);
        }

        let poller = PowerPoller::start(
            Arc::clone(&state),
            prober,
            config.poll_interval,
            config.probe_timeout,
        );

        Ok(DeviceSession {
            state,
            client,
            poller: Mutex::new(Some(poller)),
            config,
        })
    }
}

impl std::fmt::Debug for DeviceSessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSessionBuilder")
            .field("settings", &self.settings)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
