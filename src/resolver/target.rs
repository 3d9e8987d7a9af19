//! Dial target parsing (`scheme://[authority]/service-name`).

use std::fmt;
use url::Url;

/// A parsed dial target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: String,
    pub authority: String,
    /// Logical service name, looked up in the directory.
    pub endpoint: String,
}

impl Target {
    /// Parse a target URI. Returns `None` when it has no scheme or no
    /// service name.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let endpoint = url.path().trim_start_matches('/').to_string();
        if endpoint.is_empty() {
            return None;
        }

        Some(Self {
            scheme: url.scheme().to_string(),
            authority: url.host_str().unwrap_or_default().to_string(),
            endpoint,
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.authority, self.endpoint)
    }
}
