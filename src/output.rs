//! Rendering of the assembled bootstrap
//!
//! `pb` is the binary protobuf Envoy loads with `envoy -c bootstrap.pb`.
//! `summary` is a JSON digest of the listener and cluster graph meant for
//! review and diffing; Envoy cannot load it.

use std::fmt;
use std::str::FromStr;

use envoy_types::pb::envoy::config::bootstrap::v3::Bootstrap;
use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::listener::v3::{Filter, FilterChain, Listener};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::RouteSpecifier, HttpConnectionManager,
};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{
    tcp_proxy::ClusterSpecifier, TcpProxy,
};
use prost::Message;
use serde::Serialize;

use crate::errors::{Error, Result};
use crate::xds::cluster::{cluster_endpoint, socket_address_parts};
use crate::xds::filters::{decode_filter, HCM_FILTER_NAME, TCP_PROXY_FILTER_NAME};
use crate::xds::route::route_cluster;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Binary protobuf `Bootstrap`
    #[default]
    Pb,
    /// Human-readable JSON digest
    Summary,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pb => f.write_str("pb"),
            OutputFormat::Summary => f.write_str("summary"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pb" => Ok(OutputFormat::Pb),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(Error::config(format!("Unknown output format '{other}'"))),
        }
    }
}

/// Render `bootstrap` fully into memory
pub fn render(bootstrap: &Bootstrap, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Pb => Ok(bootstrap.encode_to_vec()),
        OutputFormat::Summary => {
            let mut rendered = serde_json::to_vec_pretty(&BootstrapSummary::from(bootstrap))?;
            rendered.push(b'\n');
            Ok(rendered)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BootstrapSummary {
    pub admin: Option<String>,
    pub listeners: Vec<ListenerSummary>,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Serialize)]
pub struct ListenerSummary {
    pub name: String,
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listener_filters: Vec<String>,
    pub filter_chains: Vec<FilterChainSummary>,
}

#[derive(Debug, Serialize)]
pub struct FilterChainSummary {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub server_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_socket: Option<String>,
    pub filters: Vec<FilterSummary>,
}

#[derive(Debug, Serialize)]
pub struct FilterSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub virtual_hosts: Vec<VirtualHostSummary>,
}

#[derive(Debug, Serialize)]
pub struct VirtualHostSummary {
    pub name: String,
    pub domains: Vec<String>,
    pub clusters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub name: String,
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_socket: Option<String>,
}

fn host_port((host, port): (&str, u32)) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

impl From<&Bootstrap> for BootstrapSummary {
    fn from(bootstrap: &Bootstrap) -> Self {
        let admin = bootstrap
            .admin
            .as_ref()
            .and_then(|admin| admin.address.as_ref())
            .and_then(socket_address_parts)
            .map(host_port);

        let (listeners, clusters): (Vec<_>, Vec<_>) = bootstrap
            .static_resources
            .as_ref()
            .map(|resources| {
                (
                    resources.listeners.iter().map(ListenerSummary::from).collect(),
                    resources.clusters.iter().map(ClusterSummary::from).collect(),
                )
            })
            .unwrap_or_default();

        Self { admin, listeners, clusters }
    }
}

impl From<&Listener> for ListenerSummary {
    fn from(listener: &Listener) -> Self {
        Self {
            name: listener.name.clone(),
            address: listener.address.as_ref().and_then(socket_address_parts).map(host_port),
            listener_filters: listener.listener_filters.iter().map(|f| f.name.clone()).collect(),
            filter_chains: listener.filter_chains.iter().map(FilterChainSummary::from).collect(),
        }
    }
}

impl From<&FilterChain> for FilterChainSummary {
    fn from(chain: &FilterChain) -> Self {
        Self {
            server_names: chain
                .filter_chain_match
                .as_ref()
                .map(|m| m.server_names.clone())
                .unwrap_or_default(),
            transport_socket: chain.transport_socket.as_ref().map(|socket| socket.name.clone()),
            filters: chain.filters.iter().map(FilterSummary::from).collect(),
        }
    }
}

impl From<&Filter> for FilterSummary {
    fn from(filter: &Filter) -> Self {
        let mut summary =
            Self { name: filter.name.clone(), cluster: None, virtual_hosts: Vec::new() };

        match filter.name.as_str() {
            TCP_PROXY_FILTER_NAME => {
                if let Some(TcpProxy {
                    cluster_specifier: Some(ClusterSpecifier::Cluster(cluster)), ..
                }) = decode_filter::<TcpProxy>(filter)
                {
                    summary.cluster = Some(cluster);
                }
            }
            HCM_FILTER_NAME => {
                if let Some(HttpConnectionManager {
                    route_specifier: Some(RouteSpecifier::RouteConfig(route_config)),
                    ..
                }) = decode_filter::<HttpConnectionManager>(filter)
                {
                    summary.virtual_hosts = route_config
                        .virtual_hosts
                        .iter()
                        .map(|vhost| VirtualHostSummary {
                            name: vhost.name.clone(),
                            domains: vhost.domains.clone(),
                            clusters: vhost
                                .routes
                                .iter()
                                .filter_map(route_cluster)
                                .map(str::to_string)
                                .collect(),
                        })
                        .collect();
                }
            }
            _ => {}
        }

        summary
    }
}

impl From<&Cluster> for ClusterSummary {
    fn from(cluster: &Cluster) -> Self {
        Self {
            name: cluster.name.clone(),
            endpoint: cluster_endpoint(cluster).map(host_port),
            transport_socket: cluster.transport_socket.as_ref().map(|socket| socket.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvoySettings;
    use crate::domain::{ListenerProtocol, ListenerSpec, ProxyProtocol, VirtualHostSpec};
    use crate::xds::{generate_bootstrap, sni_proxy_clusters, sni_proxy_listener, StaticResources};

    fn bootstrap() -> Bootstrap {
        let vhosts = vec![VirtualHostSpec {
            host: "10.0.0.1".to_string(),
            patterns: vec!["a.com".to_string()],
            http_port: 80,
            https_port: 443,
            proxy_protocol: ProxyProtocol::V2,
        }];
        let listener = ListenerSpec {
            protocol: ListenerProtocol::Https,
            address: "::".to_string(),
            port: 443,
        };

        generate_bootstrap(
            StaticResources {
                listeners: vec![sni_proxy_listener(&listener, &vhosts, "/dev/stdout")],
                clusters: sni_proxy_clusters(&vhosts[0]).into(),
            },
            &EnvoySettings::default(),
        )
    }

    #[test]
    fn test_pb_round_trips() {
        let bootstrap = bootstrap();
        let rendered = render(&bootstrap, OutputFormat::Pb).unwrap();
        assert_eq!(Bootstrap::decode(rendered.as_slice()).unwrap(), bootstrap);
    }

    #[test]
    fn test_summary_digest() {
        let rendered = render(&bootstrap(), OutputFormat::Summary).unwrap();
        let summary: serde_json::Value = serde_json::from_slice(&rendered).unwrap();

        assert_eq!(summary["admin"], "127.0.0.1:9901");
        assert_eq!(summary["listeners"][0]["name"], "https_443");
        assert_eq!(summary["listeners"][0]["address"], "[::]:443");
        assert_eq!(summary["listeners"][0]["filter_chains"][0]["server_names"][0], "a.com");
        assert_eq!(
            summary["listeners"][0]["filter_chains"][0]["filters"][0]["cluster"],
            "10_0_0_1_https_443"
        );
        assert_eq!(summary["clusters"][1]["endpoint"], "10.0.0.1:443");
        assert_eq!(
            summary["clusters"][1]["transport_socket"],
            "envoy.transport_sockets.upstream_proxy_protocol"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("pb".parse::<OutputFormat>().unwrap(), OutputFormat::Pb);
        assert_eq!("summary".parse::<OutputFormat>().unwrap(), OutputFormat::Summary);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
