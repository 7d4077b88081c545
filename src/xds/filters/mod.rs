//! Network, listener and HTTP filter builders shared by the synthesizers
//!
//! Every filter is emitted with a `typed_config` wrapping the encoded
//! protobuf message, never with the deprecated untyped `config` field.

use envoy_types::pb::envoy::config::accesslog::v3::AccessLog;
use envoy_types::pb::envoy::config::core::v3::HttpProtocolOptions;
use envoy_types::pb::envoy::config::listener::v3::{
    filter::ConfigType as FilterConfigType, listener_filter::ConfigType as ListenerFilterConfigType,
    Filter, ListenerFilter,
};
use envoy_types::pb::envoy::config::route::v3::RouteConfiguration;
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router as RouterFilter;
use envoy_types::pb::envoy::extensions::filters::listener::tls_inspector::v3::TlsInspector;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager::{CodecType, RouteSpecifier},
    http_filter::ConfigType as HttpFilterConfigType,
    HttpConnectionManager, HttpFilter,
};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{
    tcp_proxy::ClusterSpecifier, TcpProxy,
};
use envoy_types::pb::google::protobuf::{Any, Duration};
use prost::Message;

/// Envoy's canonical router filter name
pub const ROUTER_FILTER_NAME: &str = "envoy.filters.http.router";
pub const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";

pub const HCM_FILTER_NAME: &str = "envoy.filters.network.http_connection_manager";
pub const HCM_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";

pub const TCP_PROXY_FILTER_NAME: &str = "envoy.filters.network.tcp_proxy";
pub const TCP_PROXY_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.tcp_proxy.v3.TcpProxy";

pub const TLS_INSPECTOR_FILTER_NAME: &str = "envoy.filters.listener.tls_inspector";
pub const TLS_INSPECTOR_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.listener.tls_inspector.v3.TlsInspector";

pub const HTTP_STAT_PREFIX: &str = "ingress_http";
pub const HTTPS_STAT_PREFIX: &str = "ingress_https";

/// Helper for building Envoy `Any` values from prost messages.
pub fn any_from_message<M: Message>(type_url: impl Into<String>, msg: &M) -> Any {
    Any { type_url: type_url.into(), value: msg.encode_to_vec() }
}

/// Optional timeouts of an HTTP connection manager
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpTimeouts {
    pub request: Option<Duration>,
    pub idle: Option<Duration>,
}

/// Whole-second protobuf duration
pub fn seconds(value: u64) -> Duration {
    Duration { seconds: i64::try_from(value).unwrap_or(i64::MAX), nanos: 0 }
}

pub fn router_filter() -> HttpFilter {
    HttpFilter {
        name: ROUTER_FILTER_NAME.to_string(),
        config_type: Some(HttpFilterConfigType::TypedConfig(any_from_message(
            ROUTER_TYPE_URL,
            &RouterFilter::default(),
        ))),
        ..Default::default()
    }
}

/// `tls_inspector` listener filter exposing SNI to filter chain matching
pub fn tls_inspector() -> ListenerFilter {
    ListenerFilter {
        name: TLS_INSPECTOR_FILTER_NAME.to_string(),
        config_type: Some(ListenerFilterConfigType::TypedConfig(any_from_message(
            TLS_INSPECTOR_TYPE_URL,
            &TlsInspector::default(),
        ))),
        ..Default::default()
    }
}

/// HTTP connection manager with an inline route table and a trailing router
pub fn http_connection_manager(
    route_config: RouteConfiguration,
    access_log: AccessLog,
    timeouts: HttpTimeouts,
) -> Filter {
    let common_http_protocol_options = timeouts
        .idle
        .map(|idle| HttpProtocolOptions { idle_timeout: Some(idle), ..Default::default() });

    let hcm = HttpConnectionManager {
        codec_type: CodecType::Auto as i32,
        stat_prefix: HTTP_STAT_PREFIX.to_string(),
        route_specifier: Some(RouteSpecifier::RouteConfig(route_config)),
        http_filters: vec![router_filter()],
        access_log: vec![access_log],
        request_timeout: timeouts.request,
        common_http_protocol_options,
        ..Default::default()
    };

    Filter {
        name: HCM_FILTER_NAME.to_string(),
        config_type: Some(FilterConfigType::TypedConfig(any_from_message(HCM_TYPE_URL, &hcm))),
    }
}

/// Opaque TCP forwarding to `cluster`
pub fn tcp_proxy(cluster: impl Into<String>, access_log: AccessLog) -> Filter {
    let tcp_proxy = TcpProxy {
        stat_prefix: HTTPS_STAT_PREFIX.to_string(),
        cluster_specifier: Some(ClusterSpecifier::Cluster(cluster.into())),
        access_log: vec![access_log],
        ..Default::default()
    };

    Filter {
        name: TCP_PROXY_FILTER_NAME.to_string(),
        config_type: Some(FilterConfigType::TypedConfig(any_from_message(
            TCP_PROXY_TYPE_URL,
            &tcp_proxy,
        ))),
    }
}

/// Decode the typed config of a network filter
pub fn decode_filter<M: Message + Default>(filter: &Filter) -> Option<M> {
    match &filter.config_type {
        Some(FilterConfigType::TypedConfig(any)) => M::decode(any.value.as_slice()).ok(),
        _ => None,
    }
}
