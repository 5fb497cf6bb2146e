//! Logging setup for hosts embedding the SDK
//!
//! The library itself only emits `tracing` events. Binaries call one of the
//! init functions here once, early, to decide where those events go.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the logging mode
pub const LOG_MODE_ENV: &str = "BRAVIA_LOG_MODE";

/// Environment variable overriding the filter directive
pub const LOG_LEVEL_ENV: &str = "BRAVIA_LOG_LEVEL";

/// How log events are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber installed
    Silent,
    /// Compact stderr output at `info`
    Development,
    /// Pretty output with source locations at `debug`
    Debug,
}

impl LoggingMode {
    /// Parse a mode name; unknown names yield `None`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(LoggingMode::Silent),
            "development" | "dev" => Some(LoggingMode::Development),
            "debug" => Some(LoggingMode::Debug),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid filter directive in {var}: {reason}")]
    InvalidFilter { var: &'static str, reason: String },
}

/// Install a global subscriber for `mode`
///
/// Fails if a global subscriber is already set.
///
/// ```rust,ignore
/// bravia_sdk::logging::init_logging(LoggingMode::Development)?;
/// ```
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;

            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Install a subscriber chosen by `BRAVIA_LOG_MODE`
///
/// Accepts `silent`, `development` and `debug`; anything else, or an unset
/// variable, means silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = std::env::var(LOG_MODE_ENV)
        .ok()
        .as_deref()
        .and_then(LoggingMode::from_name)
        .unwrap_or(LoggingMode::Silent);

    init_logging(mode)
}

/// `BRAVIA_LOG_LEVEL`, then `RUST_LOG`, then `default_level`
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    for var in [LOG_LEVEL_ENV, "RUST_LOG"] {
        if let Ok(directive) = std::env::var(var) {
            return EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
                var,
                reason: e.to_string(),
            });
        }
    }

    Ok(EnvFilter::new(default_level))
}
