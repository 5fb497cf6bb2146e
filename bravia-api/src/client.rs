use std::sync::Arc;
use std::time::Duration;

use soap_client::SoapClient;
use tracing::{debug, info, warn};

use crate::{CommandCode, CommandError, Endpoint, IrccTransport};

/// Timeout for a single command POST
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout for the OPTIONS probe during endpoint resolution
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Address and control path needed to send a command
///
/// Only constructible with a non-empty address, so holding one means the
/// send preconditions are met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    ip: String,
    endpoint: Endpoint,
}

impl ResolvedSettings {
    /// Returns `None` when `ip` is empty after trimming
    pub fn new(ip: &str, endpoint: Endpoint) -> Option<Self> {
        let ip = ip.trim();
        if ip.is_empty() {
            return None;
        }
        Some(Self {
            ip: ip.to_string(),
            endpoint,
        })
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Control URL the command is posted to
    pub fn url(&self) -> String {
        self.endpoint.url(&self.ip)
    }
}

/// A client for resolving endpoints and sending IRCC commands
///
/// Holds no per-device state; the device address and endpoint are passed
/// into each call.
///
/// # Example
///
/// ```rust,no_run
/// use bravia_api::{CommandCode, IrccClient, ResolvedSettings};
///
/// # async fn run() -> Result<(), bravia_api::CommandError> {
/// let client = IrccClient::new();
/// let endpoint = client.resolve_endpoint("192.168.1.20").await;
/// let settings = ResolvedSettings::new("192.168.1.20", endpoint);
///
/// client
///     .send_command(settings.as_ref(), &CommandCode::new("AAAAAQAAAAEAAAASAw=="))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct IrccClient {
    transport: Arc<dyn IrccTransport>,
    command_timeout: Duration,
    resolve_timeout: Duration,
}

impl IrccClient {
    /// Create a client backed by a fresh `SoapClient`
    pub fn new() -> Self {
        Self::with_transport(Arc::new(SoapClient::new()))
    }

    /// Create a client over a custom transport
    pub fn with_transport(transport: Arc<dyn IrccTransport>) -> Self {
        Self {
            transport,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Find which control path the device serves
    ///
    /// Probes the preferred path with OPTIONS and selects it only on an
    /// exact 200. Every failure is logged and falls back to
    /// `Endpoint::FALLBACK`; this never errors.
    pub async fn resolve_endpoint(&self, ip: &str) -> Endpoint {
        let url = Endpoint::PREFERRED.url(ip);

        let endpoint = match self.transport.options(&url, self.resolve_timeout).await {
            Ok(200) => Endpoint::PREFERRED,
            Ok(status) => {
                debug!(%url, status, "preferred endpoint not available");
                Endpoint::FALLBACK
            }
            Err(e) => {
                warn!(%url, error = %e, "endpoint probe failed");
                Endpoint::FALLBACK
            }
        };

        info!(ip = ip.trim(), %endpoint, "resolved IRCC endpoint");
        endpoint
    }

    /// Send one command code
    ///
    /// Fails with `SettingsUnavailable` before any I/O when `settings` is
    /// `None`. Succeeds only on HTTP 200.
    pub async fn send_command(
        &self,
        settings: Option<&ResolvedSettings>,
        code: &CommandCode,
    ) -> Result<(), CommandError> {
        let Some(settings) = settings else {
            warn!(%code, "device settings unavailable, command not sent");
            return Err(CommandError::SettingsUnavailable);
        };

        let url = settings.url();
        info!(%code, ip = settings.ip(), endpoint = %settings.endpoint(), "sending command");

        let response = self
            .transport
            .post_ircc(&url, code.as_str(), self.command_timeout)
            .await
            .map_err(|e| {
                warn!(%code, %url, error = %e, "command transport failed");
                CommandError::from(e)
            })?;

        if response.is_ok() {
            debug!(%code, "command accepted");
            return Ok(());
        }

        let fault = soap_client::SoapClient::extract_fault(&response.body);
        warn!(%code, status = response.status, ?fault, "command rejected");
        Err(CommandError::UnexpectedStatusCode {
            status: response.status,
            fault,
        })
    }
}

impl Default for IrccClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IrccClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrccClient")
            .field("command_timeout", &self.command_timeout)
            .field("resolve_timeout", &self.resolve_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_settings_requires_ip() {
        assert!(ResolvedSettings::new("", Endpoint::Sony).is_none());
        assert!(ResolvedSettings::new("   ", Endpoint::Sony).is_none());

        let settings = ResolvedSettings::new(" 10.0.0.5\n", Endpoint::Default).unwrap();
        assert_eq!(settings.ip(), "10.0.0.5");
        assert_eq!(settings.url(), "http://10.0.0.5/IRCC");
    }

    #[test]
    fn test_client_timeouts() {
        let client = IrccClient::new();
        assert_eq!(client.command_timeout(), Duration::from_millis(1000));

        let client = client.with_command_timeout(Duration::from_millis(250));
        assert_eq!(client.command_timeout(), Duration::from_millis(250));
    }
}
