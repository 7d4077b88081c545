//! mTLS gateway sidecar
//!
//! A single listener terminates TLS, requires a client certificate signed by
//! the configured CA and whose SANs match one of the accepted DNS or SPIFFE
//! patterns, then forwards plain HTTP to one local backend.

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::core::v3::{
    data_source::Specifier, transport_socket::ConfigType as TransportSocketConfigType, DataSource,
    TransportSocket,
};
use envoy_types::pb::envoy::config::listener::v3::{FilterChain, Listener};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    common_tls_context::ValidationContextType, subject_alt_name_matcher::SanType,
    CertificateValidationContext, CommonTlsContext, DownstreamTlsContext, SubjectAltNameMatcher,
    TlsCertificate, UpstreamTlsContext,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{
    string_matcher::MatchPattern, RegexMatcher, StringMatcher,
};
use envoy_types::pb::google::protobuf::{Any, BoolValue};
use tracing::debug;

use crate::domain::{MtlsBackendSpec, MtlsListenerSpec};
use crate::errors::Result;
use crate::xds::access_log::file_access_log;
use crate::xds::cluster::logical_dns_cluster;
use crate::xds::filters::{any_from_message, http_connection_manager, seconds, HttpTimeouts};
use crate::xds::listener::listener_address;
use crate::xds::pattern::{compile_hostname, compile_spiffe};
use crate::xds::route::{catch_all_virtual_host, local_route};
use crate::xds::transport_socket::TLS_SOCKET_NAME;

pub const MTLS_CLUSTER_NAME: &str = "mtls_sidecar_backend";
pub const MTLS_LISTENER_NAME: &str = "mtls_sidecar_listener";
pub const MTLS_VHOST_NAME: &str = "mtls_sidecar_vhost";

pub const DOWNSTREAM_TLS_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";
pub const UPSTREAM_TLS_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.UpstreamTlsContext";

fn data_source_from_path(path: &str) -> DataSource {
    DataSource { specifier: Some(Specifier::Filename(path.to_string())), ..Default::default() }
}

fn tls_transport_socket(typed_config: Any) -> TransportSocket {
    TransportSocket {
        name: TLS_SOCKET_NAME.to_string(),
        config_type: Some(TransportSocketConfigType::TypedConfig(typed_config)),
    }
}

fn safe_regex(san_type: SanType, regex: &str) -> SubjectAltNameMatcher {
    SubjectAltNameMatcher {
        san_type: san_type as i32,
        matcher: Some(StringMatcher {
            match_pattern: Some(MatchPattern::SafeRegex(RegexMatcher {
                regex: regex.to_string(),
                ..Default::default()
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// DNS matchers for every `match_dns` pattern, then URI matchers for every SPIFFE identity
pub fn subject_alt_name_matchers(spec: &MtlsListenerSpec) -> Result<Vec<SubjectAltNameMatcher>> {
    let dns = spec.match_dns.iter().map(|pattern| {
        compile_hostname(pattern)
            .map(|compiled| safe_regex(SanType::Dns, compiled.as_str()))
            .map_err(|err| err.add_context(&format!("match_dns pattern \"{pattern}\"")))
    });

    let spiffe = spec.match_spiffe.iter().map(|identity| {
        compile_spiffe(&identity.trust_domain, &identity.service)
            .map(|compiled| safe_regex(SanType::Uri, compiled.as_str()))
            .map_err(|err| {
                err.add_context(&format!(
                    "match_spiffe identity \"{}/{}\"",
                    identity.trust_domain, identity.service
                ))
            })
    });

    dns.chain(spiffe).collect()
}

fn downstream_tls_socket(spec: &MtlsListenerSpec) -> Result<TransportSocket> {
    let validation_context = CertificateValidationContext {
        trusted_ca: Some(data_source_from_path(&spec.ca_cert)),
        match_typed_subject_alt_names: subject_alt_name_matchers(spec)?,
        ..Default::default()
    };

    let downstream = DownstreamTlsContext {
        common_tls_context: Some(CommonTlsContext {
            tls_certificates: vec![TlsCertificate {
                certificate_chain: Some(data_source_from_path(&spec.cert)),
                private_key: Some(data_source_from_path(&spec.key)),
                ..Default::default()
            }],
            validation_context_type: Some(ValidationContextType::ValidationContext(
                validation_context,
            )),
            ..Default::default()
        }),
        require_client_certificate: Some(BoolValue { value: true }),
        ..Default::default()
    };

    Ok(tls_transport_socket(any_from_message(DOWNSTREAM_TLS_TYPE_URL, &downstream)))
}

fn upstream_tls_socket(ca_cert: &str) -> TransportSocket {
    let upstream = UpstreamTlsContext {
        common_tls_context: Some(CommonTlsContext {
            validation_context_type: Some(ValidationContextType::ValidationContext(
                CertificateValidationContext {
                    trusted_ca: Some(data_source_from_path(ca_cert)),
                    ..Default::default()
                },
            )),
            ..Default::default()
        }),
        ..Default::default()
    };

    tls_transport_socket(any_from_message(UPSTREAM_TLS_TYPE_URL, &upstream))
}

/// The single backend cluster, TLS upstream only when a CA is configured
pub fn mtls_cluster(backend: &MtlsBackendSpec) -> Cluster {
    debug!(
        cluster = MTLS_CLUSTER_NAME,
        host = %backend.host,
        port = backend.port,
        upstream_tls = backend.ca_cert.is_some(),
        "Synthesizing sidecar backend cluster"
    );
    logical_dns_cluster(
        MTLS_CLUSTER_NAME,
        &backend.host,
        backend.port,
        backend.ca_cert.as_deref().map(upstream_tls_socket),
    )
}

/// The TLS-terminating listener forwarding everything to [`MTLS_CLUSTER_NAME`]
pub fn mtls_listener(spec: &MtlsListenerSpec, access_log_path: &str) -> Result<Listener> {
    let transport_socket = downstream_tls_socket(spec)
        .map_err(|err| err.add_context(MTLS_LISTENER_NAME))?;

    let timeouts = HttpTimeouts {
        request: spec.timeouts.request_seconds.map(seconds),
        idle: spec.timeouts.idle_seconds.map(seconds),
    };

    let route_config = local_route(vec![catch_all_virtual_host(MTLS_VHOST_NAME, MTLS_CLUSTER_NAME)]);

    debug!(
        listener = MTLS_LISTENER_NAME,
        address = %spec.address,
        port = spec.port,
        dns_matchers = spec.match_dns.len(),
        spiffe_matchers = spec.match_spiffe.len(),
        "Synthesizing sidecar listener"
    );

    Ok(Listener {
        name: MTLS_LISTENER_NAME.to_string(),
        address: Some(listener_address(&spec.address, spec.port)),
        filter_chains: vec![FilterChain {
            filters: vec![http_connection_manager(
                route_config,
                file_access_log(access_log_path),
                timeouts,
            )],
            transport_socket: Some(transport_socket),
            ..Default::default()
        }],
        ..Default::default()
    })
}
