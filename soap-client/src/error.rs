//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The device did not answer within the request timeout
    #[error("Request timed out")]
    Timeout,
}

impl SoapError {
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SoapError::Timeout
        } else {
            SoapError::Network(error.to_string())
        }
    }

    /// Whether this error was caused by the request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, SoapError::Timeout)
    }
}
