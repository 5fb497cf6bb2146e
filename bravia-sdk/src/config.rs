//! Configuration types for device sessions
//!
//! Controls the poll cadence of the power tracker and the timeouts applied
//! to each network operation a session performs.

use std::time::Duration;

use bravia_api::client::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_RESOLVE_TIMEOUT};

use crate::SdkError;

/// Configuration for a DeviceSession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interval between liveness probes
    /// Default: 10 seconds
    pub poll_interval: Duration,

    /// Upper bound on a single liveness probe
    /// Default: 3 seconds
    pub probe_timeout: Duration,

    /// TCP port probed for liveness; nothing is expected to listen on it
    /// Default: 1
    pub probe_port: u16,

    /// Timeout for a command POST
    /// Default: 1 second
    pub command_timeout: Duration,

    /// Timeout for the OPTIONS probe during endpoint resolution
    /// Default: 3 seconds
    pub resolve_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(3),
            probe_port: 1,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SessionConfig that notices power changes sooner
    pub fn fast_polling() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_probe_port(mut self, port: u16) -> Self {
        self.probe_port = port;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Validate the configuration and return any issues
    ///
    /// The probe timeout must stay below the poll interval so that at most
    /// one probe per device is ever in flight.
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.poll_interval.is_zero() {
            return Err(SdkError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.probe_timeout.is_zero() {
            return Err(SdkError::Configuration(
                "Probe timeout must be greater than 0".to_string(),
            ));
        }

        if self.probe_timeout >= self.poll_interval {
            return Err(SdkError::Configuration(
                "Invalid probe timeout: must be less than the poll interval".to_string(),
            ));
        }

        if self.command_timeout.is_zero() {
            return Err(SdkError::Configuration(
                "Command timeout must be greater than 0".to_string(),
            ));
        }

        if self.resolve_timeout.is_zero() {
            return Err(SdkError::Configuration(
                "Resolve timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.probe_timeout, Duration::from_secs(3));
        assert_eq!(config.probe_port, 1);
        assert_eq!(config.command_timeout, Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(SessionConfig::fast_polling().validate().is_ok());
        assert!(SessionConfig::new().validate().is_ok());
    }

    #[test]
    fn test_probe_timeout_must_be_below_interval() {
        let config = SessionConfig::default()
            .with_poll_interval(Duration::from_secs(3))
            .with_probe_timeout(Duration::from_secs(3));

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("probe timeout"));
    }

    #[test]
    fn test_zero_durations_rejected() {
        assert!(SessionConfig::default()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SessionConfig::default()
            .with_probe_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SessionConfig::default()
            .with_command_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SessionConfig::default()
            .with_resolve_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
