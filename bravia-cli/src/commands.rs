//! Subcommand implementations

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use bravia_sdk::bravia_api::{IrccClient, ResolvedSettings};
use bravia_sdk::{
    ChannelSink, CommandCode, CommandTable, DeviceConfig, DeviceSession, Endpoint,
    JsonFileSettingsStore, LivenessOutcome, LivenessProbe, MemorySettingsStore, SessionConfig,
    SettingsStore, TcpLivenessProbe,
};

use crate::SendTarget;

/// Where `watch` keeps device settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChoice {
    Memory,
    File(PathBuf),
    ConfigDir,
}

impl StoreChoice {
    pub fn from_flags(store_file: Option<PathBuf>, persist: bool) -> Self {
        match (store_file, persist) {
            (Some(path), _) => StoreChoice::File(path),
            (None, true) => StoreChoice::ConfigDir,
            (None, false) => StoreChoice::Memory,
        }
    }

    fn open(self) -> Result<Arc<dyn SettingsStore>> {
        let store: Arc<dyn SettingsStore> = match self {
            StoreChoice::Memory => Arc::new(MemorySettingsStore::new()),
            StoreChoice::File(path) => Arc::new(JsonFileSettingsStore::new(path)),
            StoreChoice::ConfigDir => Arc::new(
                JsonFileSettingsStore::in_config_dir()
                    .context("Cannot locate the user config directory")?,
            ),
        };
        Ok(store)
    }
}

pub async fn probe(ip: &str, port: u16, timeout: Duration) -> Result<()> {
    let outcome = TcpLivenessProbe::with_port(port).probe(ip, timeout).await;

    match outcome {
        LivenessOutcome::Online => println!("{}: online", ip),
        LivenessOutcome::Offline(reason) => println!("{}: offline ({:?})", ip, reason),
    }
    Ok(())
}

pub async fn resolve(ip: &str) -> Result<()> {
    let endpoint = IrccClient::new().resolve_endpoint(ip).await;
    println!("{}", endpoint.url(ip));
    Ok(())
}

pub async fn send(ip: &str, endpoint: Option<Endpoint>, target: SendTarget) -> Result<()> {
    let code = match target {
        SendTarget::Code(code) => CommandCode::new(code),
        SendTarget::Action { action, table } => {
            let table = CommandTable::load(&table)
                .with_context(|| format!("Failed to load command table {}", table.display()))?;
            table.code_for(action)?.clone()
        }
    };

    let client = IrccClient::new();
    let endpoint = match endpoint {
        Some(endpoint) => endpoint,
        None => client.resolve_endpoint(ip).await,
    };
    let settings = ResolvedSettings::new(ip, endpoint);

    client
        .send_command(settings.as_ref(), &code)
        .await
        .with_context(|| format!("Command {} was not accepted by {}", code, ip))?;

    println!("sent {} to {}", code, endpoint.url(ip));
    Ok(())
}

/// Session config for `watch`, keeping the probe bound below the interval
pub fn watch_config(interval: Duration) -> SessionConfig {
    let config = SessionConfig::default().with_poll_interval(interval);
    if config.probe_timeout >= interval {
        config.with_probe_timeout(interval / 2)
    } else {
        config
    }
}

pub async fn watch(
    ip: &str,
    id: &str,
    name: Option<String>,
    interval: Duration,
    store: StoreChoice,
) -> Result<()> {
    let store = store.open()?;
    let (sink, mut events) = ChannelSink::new();

    let mut settings = DeviceConfig::new(id, ip);
    settings.name = name;

    let session = DeviceSession::builder(settings)
        .with_config(watch_config(interval))
        .with_store(store)
        .with_sink(Arc::new(sink))
        .start()
        .await
        .context("Failed to start device session")?;

    info!(
        device_id = session.id(),
        endpoint = ?session.endpoint(),
        "watching power state, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => println!("{} {}", event.device_id, event.transition),
                None => {
                    warn!("notification channel closed");
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}
