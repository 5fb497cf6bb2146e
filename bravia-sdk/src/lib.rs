//! # Bravia SDK - device sessions for Sony Bravia sets
//!
//! Tracks the power state of a television by TCP liveness polling and sends
//! IRCC remote-control codes to it:
//!
//! ```rust,no_run
//! use bravia_sdk::{ChannelSink, DeviceConfig, DeviceSession};
//! use bravia_sdk::bravia_api::{CommandTable, RemoteAction};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bravia_sdk::SdkError> {
//!     let (sink, mut events) = ChannelSink::new();
//!     let session = DeviceSession::builder(DeviceConfig::new("den", "192.168.1.20"))
//!         .with_sink(Arc::new(sink))
//!         .start()
//!         .await?;
//!
//!     let table = CommandTable::from_json(r#"{ "VolumeUp": "AAAAAQAAAAEAAAASAw==" }"#)?;
//!     session.send_action(RemoteAction::VolumeUp, &table).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{} {}", event.device_id, event.transition);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! bravia-sdk (DeviceSession, power poller, settings, notifications)
//!     ↓
//! bravia-api (endpoint resolution, command dispatch)
//!     ↓
//! soap-client (IRCC envelope over HTTP)
//! ```
//!
//! Power is inferred, never queried: a set that refuses a connection on
//! port 1 is awake, one that does not answer is not. Notifications fire
//! only on edges.

pub mod config;
pub mod error;
pub mod liveness;
pub mod logging;
pub mod notify;
pub mod pairing;
pub mod poller;
pub mod session;
pub mod settings;

mod state;

pub use config::SessionConfig;
pub use error::{Result, SdkError};
pub use liveness::{
    classify_connect_error, probe_liveness, LivenessOutcome, LivenessProbe, OfflineReason,
    TcpLivenessProbe, PROBE_PORT,
};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use notify::{
    ChannelSink, HandlerRegistry, LogSink, NotificationSink, PowerEvent, PowerTransition,
    TriggerHandler, TriggerRegistry, TriggerSink,
};
pub use pairing::PairingSession;
pub use poller::PowerPoller;
pub use session::{DeviceSession, DeviceSessionBuilder};
pub use settings::{
    DeviceConfig, JsonFileSettingsStore, MemorySettingsStore, SettingsStore, StoreError,
};

pub use bravia_api;
pub use bravia_api::{CommandCode, CommandError, CommandTable, Endpoint, RemoteAction};
