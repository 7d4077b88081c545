//! mTLS sidecar processor: one TLS-terminating listener, one backend cluster

use serde_yaml::Value;

use super::{entity_from_value, Processor, RequiredKey, ValueKind};
use crate::config::EnvoySettings;
use crate::domain::MtlsGatewaySpec;
use crate::errors::Result;
use crate::xds::{mtls_cluster, mtls_listener, StaticResources};

pub const PROCESSOR_NAME: &str = "mtls_sidecar";

const REQUIRED_KEYS: &[RequiredKey] = &[
    RequiredKey::new("listener", ValueKind::Mapping),
    RequiredKey::new("backend", ValueKind::Mapping),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MtlsSidecarProcessor;

impl Processor for MtlsSidecarProcessor {
    fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    fn required_keys(&self) -> &'static [RequiredKey] {
        REQUIRED_KEYS
    }

    fn transform(&self, doc: &Value, settings: &EnvoySettings) -> Result<StaticResources> {
        let spec: MtlsGatewaySpec = entity_from_value(doc, PROCESSOR_NAME)?;

        Ok(StaticResources {
            listeners: vec![mtls_listener(&spec.listener, &settings.access_log)?],
            clusters: vec![mtls_cluster(&spec.backend)],
        })
    }
}
