//! TCP liveness probing
//!
//! A Bravia set has no "are you on" call, so power state is inferred from
//! how its network stack answers a connection attempt on a port nothing
//! listens on. A powered set actively refuses; a set in deep standby or off
//! the network does not answer at all.

use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error};

/// Port probed by default; chosen because nothing listens on it
pub const PROBE_PORT: u16 = 1;

/// Why a probe concluded the set is offline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    /// No route to the host (EHOSTUNREACH)
    HostUnreachable,
    /// The local network path is broken (ENETUNREACH)
    NetworkUnreachable,
    /// Nothing answered within the probe timeout
    Timeout,
    /// The configured address is empty
    InvalidAddress,
    /// An error class the prober does not specifically recognise
    Unhandled {
        kind: io::ErrorKind,
        os_code: Option<i32>,
    },
}

/// Result of a single liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessOutcome {
    Online,
    Offline(OfflineReason),
}

impl LivenessOutcome {
    pub fn is_online(&self) -> bool {
        matches!(self, LivenessOutcome::Online)
    }
}

/// Map a failed connect to a liveness outcome
///
/// A refusal means the host's stack answered, so it is powered. Every
/// class other than refusal counts as offline, including ones that may be
/// ambiguous (unresolvable names, permission errors).
pub fn classify_connect_error(error: &io::Error) -> LivenessOutcome {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => LivenessOutcome::Online,
        io::ErrorKind::HostUnreachable => {
            LivenessOutcome::Offline(OfflineReason::HostUnreachable)
        }
        io::ErrorKind::NetworkUnreachable => {
            LivenessOutcome::Offline(OfflineReason::NetworkUnreachable)
        }
        kind => LivenessOutcome::Offline(OfflineReason::Unhandled {
            kind,
            os_code: error.raw_os_error(),
        }),
    }
}

/// Probe `ip:port` and classify the result
///
/// Terminates within `limit` plus scheduling slack. The connect future is
/// dropped on every exit path, which closes the socket and cancels the
/// timer.
pub async fn probe_liveness(ip: &str, port: u16, limit: Duration) -> LivenessOutcome {
    let host = ip.trim();
    if host.is_empty() {
        error!("liveness probe skipped: device address is empty");
        return LivenessOutcome::Offline(OfflineReason::InvalidAddress);
    }

    let outcome = probe_with(TcpStream::connect((host, port)), limit).await;
    log_outcome(host, port, &outcome);
    outcome
}

pub(crate) async fn probe_with<F, S>(connect: F, limit: Duration) -> LivenessOutcome
where
    F: Future<Output = io::Result<S>>,
{
    match timeout(limit, connect).await {
        // Something listens on the probe port; the host is up either way
        Ok(Ok(_stream)) => LivenessOutcome::Online,
        Ok(Err(e)) => classify_connect_error(&e),
        Err(_) => LivenessOutcome::Offline(OfflineReason::Timeout),
    }
}

fn log_outcome(host: &str, port: u16, outcome: &LivenessOutcome) {
    match outcome {
        LivenessOutcome::Online => debug!(host, port, "liveness: online"),
        LivenessOutcome::Offline(OfflineReason::NetworkUnreachable) => error!(
            host,
            port,
            "liveness: network unreachable, check that this host can reach the configured address"
        ),
        LivenessOutcome::Offline(OfflineReason::Unhandled { kind, os_code }) => error!(
            host,
            port,
            ?kind,
            ?os_code,
            "liveness: unhandled error class, treating device as offline"
        ),
        LivenessOutcome::Offline(reason) => debug!(host, port, ?reason, "liveness: offline"),
    }
}

/// Source of liveness readings for the power poller
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, ip: &str, timeout: Duration) -> LivenessOutcome;
}

/// Probes over real TCP connections
#[derive(Debug, Clone, Copy)]
pub struct TcpLivenessProbe {
    port: u16,
}

impl TcpLivenessProbe {
    pub fn new() -> Self {
        Self { port: PROBE_PORT }
    }

    pub fn with_port(port: u16) -> Self {
        Self { port }
    }
}

impl Default for TcpLivenessProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LivenessProbe for TcpLivenessProbe {
    async fn probe(&self, ip: &str, timeout: Duration) -> LivenessOutcome {
        probe_liveness(ip, self.port, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[rstest]
    #[case(io::ErrorKind::ConnectionRefused, LivenessOutcome::Online)]
    #[case(
        io::ErrorKind::HostUnreachable,
        LivenessOutcome::Offline(OfflineReason::HostUnreachable)
    )]
    #[case(
        io::ErrorKind::NetworkUnreachable,
        LivenessOutcome::Offline(OfflineReason::NetworkUnreachable)
    )]
    #[case(
        io::ErrorKind::PermissionDenied,
        LivenessOutcome::Offline(OfflineReason::Unhandled {
            kind: io::ErrorKind::PermissionDenied,
            os_code: None,
        })
    )]
    #[case(
        io::ErrorKind::AddrNotAvailable,
        LivenessOutcome::Offline(OfflineReason::Unhandled {
            kind: io::ErrorKind::AddrNotAvailable,
            os_code: None,
        })
    )]
    fn test_connect_error_classification(
        #[case] kind: io::ErrorKind,
        #[case] expected: LivenessOutcome,
    ) {
        let error = io::Error::from(kind);
        assert_eq!(classify_connect_error(&error), expected);
    }

    #[test]
    fn test_network_unreachable_is_distinct() {
        let outcome = classify_connect_error(&io::Error::from(io::ErrorKind::NetworkUnreachable));

        assert!(!outcome.is_online());
        assert_ne!(
            outcome,
            LivenessOutcome::Offline(OfflineReason::HostUnreachable)
        );
    }

    /// Writer collecting formatted log lines in memory
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged_for(outcome: LivenessOutcome) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            log_outcome("10.0.0.5", PROBE_PORT, &outcome);
        });

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[rstest]
    #[case(
        LivenessOutcome::Offline(OfflineReason::NetworkUnreachable),
        "liveness: network unreachable"
    )]
    #[case(
        LivenessOutcome::Offline(OfflineReason::Unhandled {
            kind: io::ErrorKind::PermissionDenied,
            os_code: Some(13),
        }),
        "liveness: unhandled error class"
    )]
    fn test_error_classes_are_logged_as_errors(
        #[case] outcome: LivenessOutcome,
        #[case] marker: &str,
    ) {
        let output = logged_for(outcome);

        assert!(output.contains("ERROR"), "got: {}", output);
        assert!(output.contains(marker), "got: {}", output);
    }

    #[rstest]
    #[case(LivenessOutcome::Online)]
    #[case(LivenessOutcome::Offline(OfflineReason::HostUnreachable))]
    #[case(LivenessOutcome::Offline(OfflineReason::Timeout))]
    fn test_ordinary_outcomes_stay_below_info(#[case] outcome: LivenessOutcome) {
        assert_eq!(logged_for(outcome), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_times_out_within_bound() {
        let limit = Duration::from_secs(3);
        let started = tokio::time::Instant::now();

        let outcome = probe_with(std::future::pending::<io::Result<()>>(), limit).await;

        assert_eq!(outcome, LivenessOutcome::Offline(OfflineReason::Timeout));
        let elapsed = started.elapsed();
        assert!(elapsed >= limit);
        assert!(elapsed < limit + Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_closed_port_on_loopback_is_online() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let outcome = probe_liveness("127.0.0.1", port, Duration::from_secs(3)).await;
        assert_eq!(outcome, LivenessOutcome::Online);
    }

    #[tokio::test]
    async fn test_listening_port_is_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpLivenessProbe::with_port(port);
        let outcome = probe.probe(" 127.0.0.1 ", Duration::from_secs(3)).await;

        assert_eq!(outcome, LivenessOutcome::Online);
    }

    #[tokio::test]
    async fn test_empty_address_opens_no_socket() {
        let outcome = probe_liveness("   ", PROBE_PORT, Duration::from_secs(3)).await;
        assert_eq!(
            outcome,
            LivenessOutcome::Offline(OfflineReason::InvalidAddress)
        );
    }
}
