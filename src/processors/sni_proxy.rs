//! SNI reverse proxy processor
//!
//! Every declared listener serves the full set of backends. Clusters come out
//! as all HTTP clusters in backend order followed by all HTTPS clusters in
//! backend order.

use std::collections::HashSet;

use serde_yaml::Value;
use tracing::warn;

use super::{entity_from_value, Processor, RequiredKey, ValueKind};
use crate::config::EnvoySettings;
use crate::domain::{ListenerSpec, VirtualHostSpec};
use crate::errors::{Error, Result};
use crate::xds::{sni_proxy_clusters, sni_proxy_listener, StaticResources};

pub const PROCESSOR_NAME: &str = "sni_proxy";

/// Name existing invocations select this processor by
pub const LEGACY_NAME: &str = "zkfp";

const REQUIRED_KEYS: &[RequiredKey] = &[
    RequiredKey::new("listeners", ValueKind::Sequence),
    RequiredKey::new("backends", ValueKind::Sequence),
];

/// Non-terminating reverse proxy routing on SNI and `Host`
#[derive(Debug, Clone, Copy, Default)]
pub struct SniProxyProcessor;

impl SniProxyProcessor {
    fn sequence<'a>(doc: &'a Value, key: &str) -> Result<&'a [Value]> {
        doc.get(key)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::construction(key, "expected a sequence"))
    }

    pub fn listeners(doc: &Value) -> Result<Vec<ListenerSpec>> {
        Self::sequence(doc, "listeners")?
            .iter()
            .enumerate()
            .map(|(index, value)| {
                serde_yaml::from_value(value.clone())
                    .map_err(|err| Error::construction(format!("listeners[{index}]"), err.to_string()))
            })
            .collect()
    }

    pub fn virtual_hosts(doc: &Value) -> Result<Vec<VirtualHostSpec>> {
        Self::sequence(doc, "backends")?
            .iter()
            .enumerate()
            .map(|(index, value)| entity_from_value(value, &format!("backends[{index}]")))
            .collect()
    }
}

impl Processor for SniProxyProcessor {
    fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    fn required_keys(&self) -> &'static [RequiredKey] {
        REQUIRED_KEYS
    }

    fn transform(&self, doc: &Value, settings: &EnvoySettings) -> Result<StaticResources> {
        let listener_specs = Self::listeners(doc)?;
        let vhosts = Self::virtual_hosts(doc)?;

        let listeners = listener_specs
            .iter()
            .map(|spec| sni_proxy_listener(spec, &vhosts, &settings.access_log))
            .collect();

        let (http, https): (Vec<_>, Vec<_>) = vhosts
            .iter()
            .map(|vhost| {
                let [http, https] = sni_proxy_clusters(vhost);
                (http, https)
            })
            .unzip();

        let mut clusters = http;
        clusters.extend(https);

        let mut seen = HashSet::new();
        for cluster in &clusters {
            if !seen.insert(cluster.name.as_str()) {
                warn!(cluster = %cluster.name, "Generated cluster name is not unique");
            }
        }

        Ok(StaticResources { listeners, clusters })
    }
}
