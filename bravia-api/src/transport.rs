use std::time::Duration;

use async_trait::async_trait;
use soap_client::{HttpResponse, SoapClient, SoapError};

/// HTTP operations the IRCC client needs from the network
///
/// `SoapClient` is the production implementation. Tests substitute their
/// own to observe or script device answers.
#[async_trait]
pub trait IrccTransport: Send + Sync {
    /// Issue an OPTIONS request and return the status code
    async fn options(&self, url: &str, timeout: Duration) -> Result<u16, SoapError>;

    /// POST the IRCC envelope for `code` and return the raw response
    async fn post_ircc(
        &self,
        url: &str,
        code: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, SoapError>;
}

#[async_trait]
impl IrccTransport for SoapClient {
    async fn options(&self, url: &str, timeout: Duration) -> Result<u16, SoapError> {
        SoapClient::options(self, url, timeout).await
    }

    async fn post_ircc(
        &self,
        url: &str,
        code: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, SoapError> {
        self.send_ircc(url, code, timeout).await
    }
}
