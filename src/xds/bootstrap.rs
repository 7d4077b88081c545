//! Final Envoy bootstrap assembly

use envoy_types::pb::envoy::config::bootstrap::v3::{bootstrap, Admin, Bootstrap};
use tracing::{info, warn};

use crate::config::EnvoySettings;
use crate::xds::listener::listener_address;
use crate::xds::StaticResources;

/// Wrap the generated resources into a bootstrap with a local admin endpoint
///
/// The admin interface has no access log so that it never writes into the
/// data-plane access log.
pub fn generate_bootstrap(resources: StaticResources, settings: &EnvoySettings) -> Bootstrap {
    let admin_port = match u16::try_from(settings.admin_port) {
        Ok(port) => port,
        Err(_) => {
            warn!(admin_port = settings.admin_port, "Admin port out of range; using 9901");
            9901
        }
    };

    info!(
        listeners = resources.listeners.len(),
        clusters = resources.clusters.len(),
        admin_address = %settings.admin_address,
        admin_port,
        "Assembling bootstrap"
    );

    Bootstrap {
        admin: Some(Admin {
            access_log: Vec::new(),
            address: Some(listener_address(&settings.admin_address, admin_port)),
            ..Default::default()
        }),
        static_resources: Some(bootstrap::StaticResources {
            listeners: resources.listeners,
            clusters: resources.clusters,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xds::cluster::socket_address_parts;
    use envoy_types::pb::envoy::config::cluster::v3::Cluster;
    use envoy_types::pb::envoy::config::listener::v3::Listener;

    #[test]
    fn test_admin_and_resource_order() {
        let resources = StaticResources {
            listeners: vec![
                Listener { name: "http_80".into(), ..Default::default() },
                Listener { name: "https_443".into(), ..Default::default() },
            ],
            clusters: vec![
                Cluster { name: "b".into(), ..Default::default() },
                Cluster { name: "a".into(), ..Default::default() },
            ],
        };

        let bootstrap = generate_bootstrap(resources, &EnvoySettings::default());

        let admin = bootstrap.admin.unwrap();
        assert!(admin.access_log.is_empty());
        assert_eq!(socket_address_parts(admin.address.as_ref().unwrap()), Some(("127.0.0.1", 9901)));

        let resources = bootstrap.static_resources.unwrap();
        let listeners: Vec<_> = resources.listeners.iter().map(|l| l.name.as_str()).collect();
        let clusters: Vec<_> = resources.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(listeners, vec!["http_80", "https_443"]);
        assert_eq!(clusters, vec!["b", "a"]);
    }

    #[test]
    fn test_custom_admin_endpoint() {
        let settings = EnvoySettings {
            admin_address: "0.0.0.0".to_string(),
            admin_port: 19000,
            ..Default::default()
        };

        let bootstrap = generate_bootstrap(StaticResources::default(), &settings);
        let admin = bootstrap.admin.unwrap();
        assert_eq!(socket_address_parts(admin.address.as_ref().unwrap()), Some(("0.0.0.0", 19000)));
    }
}
