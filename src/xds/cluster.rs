//! Upstream clusters for generated backends
//!
//! Every backend resolves through a single `LOGICAL_DNS` endpoint so that both
//! IP literals and DNS names work without the caller having to say which one
//! it passed.

use envoy_types::pb::envoy::config::cluster::v3::{
    cluster::{ClusterDiscoveryType, DiscoveryType, DnsLookupFamily},
    Cluster,
};
use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, socket_address::PortSpecifier, Address, SocketAddress,
    TransportSocket,
};
use envoy_types::pb::envoy::config::endpoint::v3::{
    lb_endpoint::HostIdentifier, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints,
};
use tracing::debug;

use crate::domain::VirtualHostSpec;
use crate::xds::filters::seconds;
use crate::xds::naming::{cluster_name, ClusterProtocol};
use crate::xds::transport_socket;

/// Connect timeout applied to every generated cluster
pub const CONNECT_TIMEOUT_SECONDS: u64 = 5;

/// Socket address `host:port`
pub fn socket_address(host: &str, port: u16) -> Address {
    Address {
        address: Some(AddressType::SocketAddress(SocketAddress {
            address: host.to_string(),
            port_specifier: Some(PortSpecifier::PortValue(u32::from(port))),
            ..Default::default()
        })),
    }
}

/// Single-endpoint logical DNS cluster
pub fn logical_dns_cluster(
    name: impl Into<String>,
    host: &str,
    port: u16,
    transport_socket: Option<TransportSocket>,
) -> Cluster {
    let name = name.into();

    let lb_endpoint = LbEndpoint {
        host_identifier: Some(HostIdentifier::Endpoint(Endpoint {
            address: Some(socket_address(host, port)),
            ..Default::default()
        })),
        ..Default::default()
    };

    Cluster {
        name: name.clone(),
        connect_timeout: Some(seconds(CONNECT_TIMEOUT_SECONDS)),
        cluster_discovery_type: Some(ClusterDiscoveryType::Type(DiscoveryType::LogicalDns as i32)),
        dns_lookup_family: DnsLookupFamily::Auto as i32,
        load_assignment: Some(ClusterLoadAssignment {
            cluster_name: name,
            endpoints: vec![LocalityLbEndpoints {
                lb_endpoints: vec![lb_endpoint],
                ..Default::default()
            }],
            ..Default::default()
        }),
        transport_socket,
        ..Default::default()
    }
}

/// The HTTP and HTTPS clusters of one backend, in that order
pub fn sni_proxy_clusters(vhost: &VirtualHostSpec) -> [Cluster; 2] {
    [(ClusterProtocol::Http, vhost.http_port), (ClusterProtocol::Https, vhost.https_port)].map(
        |(protocol, port)| {
            let name = cluster_name(&vhost.host, protocol, port);
            debug!(
                cluster = %name,
                host = %vhost.host,
                port,
                proxy_protocol = vhost.proxy_protocol.as_str(),
                "Synthesizing backend cluster"
            );
            logical_dns_cluster(name, &vhost.host, port, transport_socket::build(vhost.proxy_protocol))
        },
    )
}

/// The `host:port` of a cluster's first endpoint
pub fn cluster_endpoint(cluster: &Cluster) -> Option<(&str, u32)> {
    let endpoint = cluster.load_assignment.as_ref()?.endpoints.first()?.lb_endpoints.first()?;
    let Some(HostIdentifier::Endpoint(Endpoint { address: Some(address), .. })) =
        &endpoint.host_identifier
    else {
        return None;
    };
    socket_address_parts(address)
}

pub fn socket_address_parts(address: &Address) -> Option<(&str, u32)> {
    match &address.address {
        Some(AddressType::SocketAddress(SocketAddress {
            address,
            port_specifier: Some(PortSpecifier::PortValue(port)),
            ..
        })) => Some((address.as_str(), *port)),
        _ => None,
    }
}
