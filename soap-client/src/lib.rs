//! Private SOAP client for IRCC device communication
//!
//! This crate provides a minimal SOAP client specifically designed for
//! sending IRCC (infrared command over IP) codes to Sony televisions. It
//! also supports the OPTIONS probe used to find which control path a set
//! exposes.

mod error;

pub use error::SoapError;

use std::time::Duration;

use rand::Rng;
use reqwest::Method;
use tracing::debug;
use xmltree::Element;

/// UPnP service URI of the IRCC control service
pub const IRCC_SERVICE_URI: &str = "urn:schemas-sony-com:service:IRCC:1";

/// SOAP action carrying a single command code
pub const IRCC_ACTION: &str = "X_SendIRCC";

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Upper bound (exclusive) of the cache-busting `random` header value
const NONCE_BOUND: u32 = 1_000_000_000;

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code returned by the device
    pub status: u16,
    /// Raw response body (may be empty)
    pub body: String,
}

impl HttpResponse {
    /// Whether the device answered with exactly `200 OK`
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A minimal SOAP client for IRCC device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
}

impl SoapClient {
    /// Create a new SOAP client with default configuration
    ///
    /// Timeouts are applied per request, so a single client can serve both
    /// the short command sends and the slower endpoint probes.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Create a SOAP client around an existing `reqwest` client
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Build the `X_SendIRCC` envelope for a command code
    ///
    /// The code is inserted verbatim; IRCC codes are base64 strings and
    /// never contain XML metacharacters.
    pub fn build_envelope(code: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><s:Envelope xmlns:s="{ns}" s:encodingStyle="{enc}"><s:Body><u:{action} xmlns:u="{service}"><IRCCCode>{code}</IRCCCode></u:{action}></s:Body></s:Envelope>"#,
            ns = ENVELOPE_NS,
            enc = ENCODING_STYLE,
            action = IRCC_ACTION,
            service = IRCC_SERVICE_URI,
            code = code,
        )
    }

    /// POST an IRCC command code to `url`
    ///
    /// Any HTTP status is returned as `Ok`; classifying it is up to the
    /// caller. Only transport-level failures become errors.
    pub async fn send_ircc(
        &self,
        url: &str,
        code: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, SoapError> {
        let nonce = rand::thread_rng().gen_range(0..NONCE_BOUND);
        let soap_action = format!("\"{}#{}\"", IRCC_SERVICE_URI, IRCC_ACTION);

        debug!(url, code, nonce, "posting IRCC envelope");

        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPACTION", soap_action)
            .header("cache-control", "no-cache")
            .header("random", nonce.to_string())
            .body(Self::build_envelope(code))
            .send()
            .await
            .map_err(SoapError::from_reqwest)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(SoapError::from_reqwest)?;

        Ok(HttpResponse { status, body })
    }

    /// Issue an OPTIONS request to `url` and return the status code
    pub async fn options(&self, url: &str, timeout: Duration) -> Result<u16, SoapError> {
        debug!(url, "probing endpoint with OPTIONS");

        let response = self
            .http
            .request(Method::OPTIONS, url)
            .timeout(timeout)
            .send()
            .await
            .map_err(SoapError::from_reqwest)?;

        Ok(response.status().as_u16())
    }

    /// Extract the UPnP error code from a SOAP fault body
    ///
    /// Returns `None` when the body is not XML or carries no fault. A fault
    /// without a parseable `errorCode` maps to 500.
    pub fn extract_fault(body: &str) -> Option<u16> {
        let xml = Element::parse(body.as_bytes()).ok()?;
        let fault = xml.get_child("Body")?.get_child("Fault")?;

        let code = fault
            .get_child("detail")
            .and_then(|d| d.get_child("UPnPError"))
            .and_then(|e| e.get_child("errorCode"))
            .and_then(|c| c.get_text())
            .and_then(|t| t.trim().parse::<u16>().ok())
            .unwrap_or(500);

        Some(code)
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}
