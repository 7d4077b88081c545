//! Entities of the mTLS sidecar document.
//!
//! ```yaml
//! listener:
//!   port: 8443
//!   ca_cert: /etc/tls/ca.pem
//!   cert: /etc/tls/server.pem
//!   key: /etc/tls/server.key
//!   match_dns: ["*.svc.example.org"]
//!   match_spiffe:
//!     - { trust_domain: example.org, service: "svc/**" }
//! backend:
//!   port: 8080
//! ```

use serde::{Deserialize, Serialize};
use validator::Validate;

/// The complete sidecar description: one listener, one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MtlsGatewaySpec {
    #[validate(nested)]
    pub listener: MtlsListenerSpec,

    #[validate(nested)]
    pub backend: MtlsBackendSpec,
}

/// TLS-terminating listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MtlsListenerSpec {
    pub port: u16,

    #[serde(default = "default_listener_address")]
    pub address: String,

    /// CA bundle client certificates are validated against
    #[validate(length(min = 1, message = "Listener ca_cert cannot be empty"))]
    pub ca_cert: String,

    /// Server certificate chain
    #[validate(length(min = 1, message = "Listener cert cannot be empty"))]
    pub cert: String,

    /// Server private key
    #[validate(length(min = 1, message = "Listener key cannot be empty"))]
    pub key: String,

    /// Wildcard patterns accepted against DNS SANs
    #[serde(default)]
    pub match_dns: Vec<String>,

    /// SPIFFE identities accepted against URI SANs
    #[serde(default)]
    #[validate(nested)]
    pub match_spiffe: Vec<SpiffeMatch>,

    #[serde(default)]
    #[validate(nested)]
    pub timeouts: ListenerTimeouts,
}

fn default_listener_address() -> String {
    "::".to_string()
}

/// One accepted SPIFFE identity, `spiffe://{trust_domain}/{service}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SpiffeMatch {
    #[validate(length(min = 1, message = "SPIFFE trust_domain cannot be empty"))]
    pub trust_domain: String,

    #[validate(length(min = 1, message = "SPIFFE service cannot be empty"))]
    pub service: String,
}

/// Largest whole-second value a protobuf `Duration` can carry
pub const MAX_DURATION_SECONDS: u64 = 315_576_000_000;

/// Optional HTTP timeouts applied behind TLS termination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ListenerTimeouts {
    /// Whole-request timeout in seconds
    #[validate(range(max = MAX_DURATION_SECONDS, message = "Timeout exceeds the protobuf Duration range"))]
    pub request_seconds: Option<u64>,

    /// Connection idle timeout in seconds
    #[validate(range(max = MAX_DURATION_SECONDS, message = "Timeout exceeds the protobuf Duration range"))]
    pub idle_seconds: Option<u64>,
}

/// Upstream the sidecar forwards to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MtlsBackendSpec {
    pub port: u16,

    #[serde(default = "default_backend_host")]
    #[validate(length(min = 1, message = "Backend host cannot be empty"))]
    pub host: String,

    /// When set, the upstream connection uses TLS trusting this CA
    pub ca_cert: Option<String>,
}

fn default_backend_host() -> String {
    "127.0.0.1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults() {
        let backend: MtlsBackendSpec = serde_yaml::from_str("port: 8080\n").unwrap();
        assert_eq!(backend.host, "127.0.0.1");
        assert_eq!(backend.ca_cert, None);
    }

    #[test]
    fn test_listener_defaults() {
        let listener: MtlsListenerSpec =
            serde_yaml::from_str("port: 8443\nca_cert: ca.pem\ncert: c.pem\nkey: k.pem\n").unwrap();

        assert_eq!(listener.address, "::");
        assert!(listener.match_dns.is_empty());
        assert!(listener.match_spiffe.is_empty());
        assert_eq!(listener.timeouts, ListenerTimeouts::default());
    }

    #[test]
    fn test_nested_validation() {
        let spec: MtlsGatewaySpec = serde_yaml::from_str(
            "listener:\n  port: 1\n  ca_cert: ca\n  cert: c\n  key: k\n  match_spiffe:\n    - { trust_domain: '', service: s }\nbackend:\n  port: 2\n",
        )
        .unwrap();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_timeouts_beyond_duration_range_are_rejected() {
        let timeouts: ListenerTimeouts =
            serde_yaml::from_str("request_seconds: 18446744073709551615
").unwrap();
        assert!(timeouts.validate().is_err());

        let timeouts: ListenerTimeouts =
            serde_yaml::from_str("idle_seconds: 315576000001
").unwrap();
        assert!(timeouts.validate().is_err());

        let timeouts: ListenerTimeouts =
            serde_yaml::from_str("request_seconds: 315576000000
idle_seconds: 60
").unwrap();
        assert!(timeouts.validate().is_ok());
    }

    #[test]
    fn test_unknown_listener_key_is_rejected() {
        let result = serde_yaml::from_str::<MtlsListenerSpec>(
            "port: 1\nca_cert: ca\ncert: c\nkey: k\nmatch_cn: [x]\n",
        );
        assert!(result.is_err());
    }
}
