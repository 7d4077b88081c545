//! Envoy resource synthesis
//!
//! Builders turning typed input entities into Envoy v3 messages from
//! `envoy-types`:
//! - pattern compilation and deterministic naming
//! - listeners with their filter chains and inline route tables
//! - upstream clusters with optional PROXY protocol or TLS sockets
//! - the final bootstrap wrapping everything for a static Envoy

pub mod access_log;
pub mod bootstrap;
pub mod cluster;
pub mod filters;
pub mod listener;
pub mod mtls;
pub mod naming;
pub mod pattern;
pub mod route;
pub mod transport_socket;

pub use bootstrap::generate_bootstrap;
pub use cluster::sni_proxy_clusters;
pub use listener::sni_proxy_listener;
pub use mtls::{mtls_cluster, mtls_listener};
pub use naming::{cluster_name, ClusterProtocol};
pub use pattern::{compile, compile_hostname, compile_spiffe, CompiledPattern, PatternKind};

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::listener::v3::Listener;

/// Listeners and clusters produced by a processor, in emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticResources {
    pub listeners: Vec<Listener>,
    pub clusters: Vec<Cluster>,
}
