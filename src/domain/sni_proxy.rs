//! Entities of the SNI reverse proxy document.
//!
//! ```yaml
//! listeners:
//!   - { protocol: http, address: "::", port: 80 }
//!   - { protocol: https, address: "::", port: 443 }
//! backends:
//!   - host: 10.0.0.1
//!     patterns: ["*.a.com", "a.com"]
//!     proxy_protocol: v2
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Protocol spoken by a listener
///
/// Unrecognised tokens are kept verbatim so that the listener can still be
/// named after them; such listeners are synthesized without filter chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListenerProtocol {
    Http,
    Https,
    Unknown(String),
}

impl ListenerProtocol {
    pub fn as_str(&self) -> &str {
        match self {
            ListenerProtocol::Http => "http",
            ListenerProtocol::Https => "https",
            ListenerProtocol::Unknown(token) => token,
        }
    }
}

impl From<String> for ListenerProtocol {
    fn from(value: String) -> Self {
        match value.as_str() {
            "http" => ListenerProtocol::Http,
            "https" => ListenerProtocol::Https,
            _ => ListenerProtocol::Unknown(value),
        }
    }
}

impl From<ListenerProtocol> for String {
    fn from(value: ListenerProtocol) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ListenerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerSpec {
    pub protocol: ListenerProtocol,

    #[serde(default = "default_bind_address")]
    pub address: String,

    pub port: u16,
}

fn default_bind_address() -> String {
    "::".to_string()
}

/// PROXY protocol dialect spoken towards a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    None,
    #[default]
    V1,
    V2,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::None => "none",
            ProxyProtocol::V1 => "v1",
            ProxyProtocol::V2 => "v2",
        }
    }
}

/// A backend plus the client-facing hostname patterns routed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VirtualHostSpec {
    /// Upstream address (IP or DNS name)
    #[validate(length(min = 1, message = "Backend host cannot be empty"))]
    pub host: String,

    /// Hostname patterns, in match priority order
    pub patterns: Vec<String>,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_https_port")]
    pub https_port: u16,

    /// An explicit `null` disables the PROXY protocol, same as `none`
    #[serde(default = "default_proxy_protocol", deserialize_with = "nullable_proxy_protocol")]
    pub proxy_protocol: ProxyProtocol,
}

fn default_http_port() -> u16 {
    80
}

fn default_https_port() -> u16 {
    443
}

fn default_proxy_protocol() -> ProxyProtocol {
    ProxyProtocol::V1
}

fn nullable_proxy_protocol<'de, D>(deserializer: D) -> Result<ProxyProtocol, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ProxyProtocol>::deserialize(deserializer)?.unwrap_or(ProxyProtocol::None))
}
