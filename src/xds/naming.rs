//! Deterministic names for generated clusters

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Maximal runs of characters that may not appear in a cluster name
static NAME_SANITIZER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("NAME_SANITIZER should be a valid regex"));

/// Upstream protocol a generated cluster carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterProtocol {
    Http,
    Https,
}

impl ClusterProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterProtocol::Http => "http",
            ClusterProtocol::Https => "https",
        }
    }
}

impl fmt::Display for ClusterProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase `host` and collapse every run outside `[a-z0-9]` into one `_`
pub fn sanitize_host(host: &str) -> String {
    NAME_SANITIZER.replace_all(&host.to_lowercase(), "_").into_owned()
}

/// `{sanitized_host}_{protocol}_{port}`
pub fn cluster_name(host: &str, protocol: ClusterProtocol, port: u16) -> String {
    format!("{}_{}_{}", sanitize_host(host), protocol, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_name_sanitizes_host() {
        assert_eq!(cluster_name("My-Host.com", ClusterProtocol::Http, 80), "my_host_com_http_80");
        assert_eq!(cluster_name("10.0.0.1", ClusterProtocol::Https, 443), "10_0_0_1_https_443");
    }

    #[test]
    fn test_runs_collapse_to_one_underscore() {
        assert_eq!(sanitize_host("a..--b"), "a_b");
        assert_eq!(sanitize_host("[::1]"), "_1_");
    }

    #[test]
    fn test_distinct_hosts_may_collide() {
        assert_eq!(
            cluster_name("a.b", ClusterProtocol::Http, 80),
            cluster_name("a-b", ClusterProtocol::Http, 80)
        );
    }
}
