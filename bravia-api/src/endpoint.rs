use serde::{Deserialize, Serialize};

/// The HTTP paths a Bravia set may mount its IRCC control service on
///
/// Older sets answer on `/IRCC`; newer firmware moved the service under
/// `/sony/IRCC`. The persisted form is the path itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// `/IRCC`, used when the preferred path cannot be confirmed
    #[serde(rename = "/IRCC")]
    Default,

    /// `/sony/IRCC`, the preferred path on current firmware
    #[serde(rename = "/sony/IRCC")]
    Sony,
}

impl Endpoint {
    /// The variant probed first during endpoint resolution
    pub const PREFERRED: Endpoint = Endpoint::Sony;

    /// The variant selected when the preferred probe fails
    pub const FALLBACK: Endpoint = Endpoint::Default;

    /// HTTP path of this endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Default => "/IRCC",
            Endpoint::Sony => "/sony/IRCC",
        }
    }

    /// Full control URL for a device address
    ///
    /// `host` may carry a port (`192.168.1.20:8080`); surrounding
    /// whitespace is removed.
    pub fn url(&self, host: &str) -> String {
        format!("http://{}{}", host.trim(), self.path())
    }

    /// Parse a persisted path back into an endpoint
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim() {
            "/IRCC" => Some(Endpoint::Default),
            "/sony/IRCC" => Some(Endpoint::Sony),
            _ => None,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
