//! Inline route tables for generated HTTP connection managers

use envoy_types::pb::envoy::config::route::v3::{
    route::Action, route_action::ClusterSpecifier, route_match::PathSpecifier, Route, RouteAction,
    RouteConfiguration, RouteMatch, VirtualHost,
};

use crate::domain::VirtualHostSpec;
use crate::xds::naming::{cluster_name, ClusterProtocol};

/// Name of every inline route table the generator emits
pub const LOCAL_ROUTE_NAME: &str = "local_route";

/// Route everything under `/` to `cluster`
pub fn prefix_route(cluster: impl Into<String>) -> Route {
    Route {
        r#match: Some(RouteMatch {
            path_specifier: Some(PathSpecifier::Prefix("/".to_string())),
            ..Default::default()
        }),
        action: Some(Action::Route(RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(cluster.into())),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Virtual host answering for a backend's patterns on plain HTTP
///
/// Patterns are used as domains verbatim, then once more with the backend's
/// HTTP port appended so requests carrying an explicit port also match.
pub fn http_virtual_host(vhost: &VirtualHostSpec) -> VirtualHost {
    let domains = vhost
        .patterns
        .iter()
        .cloned()
        .chain(vhost.patterns.iter().map(|pattern| format!("{pattern}:{}", vhost.http_port)))
        .collect();

    VirtualHost {
        name: format!("{}_service_http_{}", vhost.host, vhost.http_port),
        domains,
        routes: vec![prefix_route(cluster_name(
            &vhost.host,
            ClusterProtocol::Http,
            vhost.http_port,
        ))],
        ..Default::default()
    }
}

/// Virtual host matching any `Host` and forwarding to `cluster`
pub fn catch_all_virtual_host(name: &str, cluster: &str) -> VirtualHost {
    VirtualHost {
        name: name.to_string(),
        domains: vec!["*".to_string()],
        routes: vec![prefix_route(cluster)],
        ..Default::default()
    }
}

pub fn local_route(virtual_hosts: Vec<VirtualHost>) -> RouteConfiguration {
    RouteConfiguration {
        name: LOCAL_ROUTE_NAME.to_string(),
        virtual_hosts,
        ..Default::default()
    }
}

/// Cluster targeted by a route built here, if any
pub fn route_cluster(route: &Route) -> Option<&str> {
    match &route.action {
        Some(Action::Route(RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(cluster)),
            ..
        })) => Some(cluster),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProxyProtocol;

    fn vhost(host: &str, patterns: &[&str], http_port: u16) -> VirtualHostSpec {
        VirtualHostSpec {
            host: host.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            http_port,
            https_port: 443,
            proxy_protocol: ProxyProtocol::V1,
        }
    }

    #[test]
    fn test_http_virtual_host_domains() {
        let virtual_host = http_virtual_host(&vhost("10.0.0.1", &["*.a.com", "a.com"], 8080));

        assert_eq!(virtual_host.name, "10.0.0.1_service_http_8080");
        assert_eq!(
            virtual_host.domains,
            vec!["*.a.com", "a.com", "*.a.com:8080", "a.com:8080"]
        );
        assert_eq!(virtual_host.routes.len(), 1);
        assert_eq!(route_cluster(&virtual_host.routes[0]), Some("10_0_0_1_http_8080"));
    }

    #[test]
    fn test_catch_all_virtual_host() {
        let virtual_host = catch_all_virtual_host("mtls_sidecar_vhost", "mtls_sidecar_backend");
        assert_eq!(virtual_host.domains, vec!["*"]);
        assert_eq!(route_cluster(&virtual_host.routes[0]), Some("mtls_sidecar_backend"));

        let Some(RouteMatch { path_specifier: Some(PathSpecifier::Prefix(prefix)), .. }) =
            &virtual_host.routes[0].r#match
        else {
            panic!("route should match on a prefix");
        };
        assert_eq!(prefix, "/");
    }

    #[test]
    fn test_local_route_name() {
        let table = local_route(vec![]);
        assert_eq!(table.name, "local_route");
        assert!(table.virtual_hosts.is_empty());
    }
}
