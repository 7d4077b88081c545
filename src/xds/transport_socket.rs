//! Upstream transport sockets for generated clusters
//!
//! A backend speaking the PROXY protocol gets a two-layer socket: the
//! `upstream_proxy_protocol` wrapper carrying the dialect, around a plain
//! `raw_buffer` socket. Backends without the PROXY protocol use Envoy's
//! default plain TCP socket, so no transport socket is emitted at all.

use envoy_types::pb::envoy::config::core::v3::{
    proxy_protocol_config::Version, transport_socket::ConfigType as TransportSocketConfigType,
    ProxyProtocolConfig, TransportSocket,
};
use envoy_types::pb::envoy::extensions::transport_sockets::proxy_protocol::v3::ProxyProtocolUpstreamTransport;
use envoy_types::pb::envoy::extensions::transport_sockets::raw_buffer::v3::RawBuffer;

use crate::domain::ProxyProtocol;
use crate::xds::filters::any_from_message;

pub const PROXY_PROTOCOL_SOCKET_NAME: &str = "envoy.transport_sockets.upstream_proxy_protocol";
pub const PROXY_PROTOCOL_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.proxy_protocol.v3.ProxyProtocolUpstreamTransport";
pub const RAW_BUFFER_SOCKET_NAME: &str = "envoy.transport_sockets.raw_buffer";
pub const RAW_BUFFER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.raw_buffer.v3.RawBuffer";
pub const TLS_SOCKET_NAME: &str = "envoy.transport_sockets.tls";

fn raw_buffer() -> TransportSocket {
    TransportSocket {
        name: RAW_BUFFER_SOCKET_NAME.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(any_from_message(
            RAW_BUFFER_TYPE_URL,
            &RawBuffer::default(),
        ))),
    }
}

/// Build the upstream socket for a PROXY protocol dialect, `None` for plain TCP
pub fn build(proxy_protocol: ProxyProtocol) -> Option<TransportSocket> {
    let version = match proxy_protocol {
        ProxyProtocol::None => return None,
        ProxyProtocol::V1 => Version::V1,
        ProxyProtocol::V2 => Version::V2,
    };

    let upstream = ProxyProtocolUpstreamTransport {
        config: Some(ProxyProtocolConfig { version: version as i32, ..Default::default() }),
        transport_socket: Some(raw_buffer()),
        ..Default::default()
    };

    Some(TransportSocket {
        name: PROXY_PROTOCOL_SOCKET_NAME.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(any_from_message(
            PROXY_PROTOCOL_TYPE_URL,
            &upstream,
        ))),
    })
}
