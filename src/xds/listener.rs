//! Listeners of the SNI reverse proxy
//!
//! Plain HTTP listeners terminate HTTP and route on the `Host` header through
//! one virtual host per backend. HTTPS listeners never terminate TLS: the
//! `tls_inspector` reads the SNI and one filter chain per backend forwards the
//! raw stream to that backend's HTTPS cluster.

use std::collections::HashMap;

use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress,
};
use envoy_types::pb::envoy::config::listener::v3::{FilterChain, FilterChainMatch, Listener};
use tracing::{debug, warn};

use crate::domain::{ListenerProtocol, ListenerSpec, VirtualHostSpec};
use crate::xds::access_log::file_access_log;
use crate::xds::filters::{http_connection_manager, tcp_proxy, tls_inspector, HttpTimeouts};
use crate::xds::naming::{cluster_name, ClusterProtocol};
use crate::xds::route::{http_virtual_host, local_route};

/// The IPv6 wildcard, which also accepts IPv4 when `ipv4_compat` is set
pub const IPV6_WILDCARD: &str = "::";

/// Bind address for a listener
pub fn listener_address(address: &str, port: u16) -> Address {
    Address {
        address: Some(AddressType::SocketAddress(SocketAddress {
            address: address.to_string(),
            port_specifier: Some(PortSpecifier::PortValue(u32::from(port))),
            ipv4_compat: address == IPV6_WILDCARD,
            ..Default::default()
        })),
    }
}

/// `{protocol}_{port}`
pub fn listener_name(spec: &ListenerSpec) -> String {
    format!("{}_{}", spec.protocol, spec.port)
}

/// Build one listener serving every backend
pub fn sni_proxy_listener(
    spec: &ListenerSpec,
    vhosts: &[VirtualHostSpec],
    access_log_path: &str,
) -> Listener {
    let name = listener_name(spec);

    let mut listener = Listener {
        name: name.clone(),
        address: Some(listener_address(&spec.address, spec.port)),
        ..Default::default()
    };

    match &spec.protocol {
        ListenerProtocol::Http => {
            listener.filter_chains = vec![http_filter_chain(vhosts, access_log_path)];
        }
        ListenerProtocol::Https => {
            listener.filter_chains = https_filter_chains(&name, vhosts, access_log_path);
            listener.listener_filters = vec![tls_inspector()];
        }
        ListenerProtocol::Unknown(token) => {
            warn!(
                listener = %name,
                protocol = %token,
                "Unknown listener protocol; listener will have no filter chains"
            );
        }
    }

    debug!(
        listener = %name,
        address = %spec.address,
        port = spec.port,
        filter_chains = listener.filter_chains.len(),
        "Synthesized listener"
    );

    listener
}

fn http_filter_chain(vhosts: &[VirtualHostSpec], access_log_path: &str) -> FilterChain {
    let route_config = local_route(vhosts.iter().map(http_virtual_host).collect());

    FilterChain {
        filters: vec![http_connection_manager(
            route_config,
            file_access_log(access_log_path),
            HttpTimeouts::default(),
        )],
        ..Default::default()
    }
}

fn https_filter_chains(
    listener: &str,
    vhosts: &[VirtualHostSpec],
    access_log_path: &str,
) -> Vec<FilterChain> {
    let mut claimed: HashMap<&str, &str> = HashMap::new();

    vhosts
        .iter()
        .map(|vhost| {
            if vhost.patterns.is_empty() {
                warn!(
                    listener = %listener,
                    backend = %vhost.host,
                    "Backend declares no patterns; its chain matches every server name"
                );
            }

            for pattern in &vhost.patterns {
                let Some(previous) = claimed.insert(pattern.as_str(), vhost.host.as_str()) else {
                    continue;
                };
                if previous != vhost.host {
                    warn!(
                        listener = %listener,
                        server_name = %pattern,
                        first_backend = %previous,
                        backend = %vhost.host,
                        "Server name is claimed by more than one backend; Envoy will reject this listener at load time"
                    );
                }
            }

            FilterChain {
                filter_chain_match: Some(FilterChainMatch {
                    server_names: vhost.patterns.clone(),
                    ..Default::default()
                }),
                filters: vec![tcp_proxy(
                    cluster_name(&vhost.host, ClusterProtocol::Https, vhost.https_port),
                    file_access_log(access_log_path),
                )],
                ..Default::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProxyProtocol;
    use crate::xds::filters::{decode_filter, TLS_INSPECTOR_FILTER_NAME};
    use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
        http_connection_manager::RouteSpecifier, HttpConnectionManager,
    };
    use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{
        tcp_proxy::ClusterSpecifier, TcpProxy,
    };

    fn listener_spec(protocol: &str, port: u16) -> ListenerSpec {
        ListenerSpec {
            protocol: ListenerProtocol::from(protocol.to_string()),
            address: "::".to_string(),
            port,
        }
    }

    fn vhost(host: &str, patterns: &[&str]) -> VirtualHostSpec {
        VirtualHostSpec {
            host: host.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            http_port: 80,
            https_port: 443,
            proxy_protocol: ProxyProtocol::V1,
        }
    }

    fn backends() -> Vec<VirtualHostSpec> {
        vec![vhost("10.0.0.1", &["*.a.com", "a.com"]), vhost("10.0.0.2", &["b.com"])]
    }

    #[test]
    fn test_listener_address_ipv4_compat() {
        let address = listener_address("::", 443);
        let Some(AddressType::SocketAddress(socket)) = address.address else { unreachable!() };
        assert!(socket.ipv4_compat);

        let address = listener_address("0.0.0.0", 443);
        let Some(AddressType::SocketAddress(socket)) = address.address else { unreachable!() };
        assert!(!socket.ipv4_compat);
    }

    #[test]
    fn test_http_listener() {
        let listener = sni_proxy_listener(&listener_spec("http", 80), &backends(), "/dev/stdout");

        assert_eq!(listener.name, "http_80");
        assert!(listener.listener_filters.is_empty());
        assert_eq!(listener.filter_chains.len(), 1);

        let hcm: HttpConnectionManager =
            decode_filter(&listener.filter_chains[0].filters[0]).unwrap();
        let Some(RouteSpecifier::RouteConfig(route_config)) = hcm.route_specifier else {
            panic!("expected inline route config");
        };
        assert_eq!(route_config.name, "local_route");
        let names: Vec<_> = route_config.virtual_hosts.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["10.0.0.1_service_http_80", "10.0.0.2_service_http_80"]);
    }

    #[test]
    fn test_https_listener_chains_follow_backend_order() {
        let listener = sni_proxy_listener(&listener_spec("https", 443), &backends(), "/dev/stdout");

        assert_eq!(listener.name, "https_443");
        assert_eq!(listener.listener_filters.len(), 1);
        assert_eq!(listener.listener_filters[0].name, TLS_INSPECTOR_FILTER_NAME);

        let server_names: Vec<_> = listener
            .filter_chains
            .iter()
            .map(|chain| chain.filter_chain_match.as_ref().unwrap().server_names.clone())
            .collect();
        assert_eq!(server_names, vec![vec!["*.a.com", "a.com"], vec!["b.com"]]);

        let clusters: Vec<_> = listener
            .filter_chains
            .iter()
            .map(|chain| {
                let proxy: TcpProxy = decode_filter(&chain.filters[0]).unwrap();
                match proxy.cluster_specifier {
                    Some(ClusterSpecifier::Cluster(cluster)) => cluster,
                    other => panic!("unexpected cluster specifier {other:?}"),
                }
            })
            .collect();
        assert_eq!(clusters, vec!["10_0_0_1_https_443", "10_0_0_2_https_443"]);
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_unknown_protocol_is_inert() {
        let listener = sni_proxy_listener(&listener_spec("quic", 8443), &backends(), "/dev/stdout");

        assert_eq!(listener.name, "quic_8443");
        assert!(listener.filter_chains.is_empty());
        assert!(listener.listener_filters.is_empty());
        assert!(logs_contain("Unknown listener protocol"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_duplicate_server_name_is_logged() {
        let vhosts = vec![vhost("10.0.0.1", &["a.com"]), vhost("10.0.0.2", &["a.com"])];
        let listener = sni_proxy_listener(&listener_spec("https", 443), &vhosts, "/dev/stdout");

        assert_eq!(listener.filter_chains.len(), 2);
        assert!(logs_contain("claimed by more than one backend"));
        assert!(logs_contain("reject this listener at load time"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_backend_without_patterns_is_logged() {
        let vhosts = vec![vhost("10.0.0.1", &[])];
        let listener = sni_proxy_listener(&listener_spec("https", 443), &vhosts, "/dev/stdout");

        assert_eq!(listener.filter_chains.len(), 1);
        let chain_match = listener.filter_chains[0].filter_chain_match.as_ref().unwrap();
        assert!(chain_match.server_names.is_empty());
        assert!(logs_contain("declares no patterns"));
    }
}
