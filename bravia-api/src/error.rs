use soap_client::SoapError;
use thiserror::Error;

/// High-level API errors for Bravia operations
///
/// Covers failures that are not part of the command-send contract, such
/// as a malformed command table.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Response or input parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid parameter value
    ///
    /// Covers unknown action names and unreadable table files.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Why a command send did not execute
///
/// Returned to the caller of a send so an automation can tell whether the
/// key press reached the set. Sends are never retried at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No resolved address and endpoint; nothing was sent
    #[error("device settings unavailable")]
    SettingsUnavailable,

    /// The device answered with a status other than 200
    #[error("unexpected status code {status}")]
    UnexpectedStatusCode {
        status: u16,
        /// UPnP error code from a SOAP fault body, when present
        fault: Option<u16>,
    },

    /// Connection-level failure, including the request timeout
    #[error("transport error: {0}")]
    TransportError(String),
}

impl From<SoapError> for CommandError {
    fn from(error: SoapError) -> Self {
        CommandError::TransportError(error.to_string())
    }
}
