//! # Processors
//!
//! A processor turns one kind of declarative YAML document into Envoy static
//! resources. Processors are registered by name in a [`ProcessorRegistry`] at
//! startup; the command line selects one and [`run_pipeline`] drives it.
//!
//! Every run is two-phased. Schema validation inspects the raw document and
//! reports every problem it finds at once. Only a document that passes is
//! transformed, and the transform stops at the first field value it cannot
//! turn into an entity.

pub mod mtls_sidecar;
pub mod sni_proxy;

pub use mtls_sidecar::MtlsSidecarProcessor;
pub use sni_proxy::SniProxyProcessor;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::EnvoySettings;
use crate::errors::{describe_validation_errors, Error, Result};
use crate::synth_span;
use crate::xds::StaticResources;

/// Shape a required top-level value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Mapping,
    Sequence,
}

impl ValueKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Mapping => value.is_mapping(),
            ValueKind::Sequence => value.is_sequence(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Mapping => f.write_str("mapping"),
            ValueKind::Sequence => f.write_str("sequence"),
        }
    }
}

/// A top-level key a processor cannot work without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredKey {
    pub key: &'static str,
    pub kind: ValueKind,
}

impl RequiredKey {
    pub const fn new(key: &'static str, kind: ValueKind) -> Self {
        Self { key, kind }
    }
}

/// Human name of a YAML value's type, used in validation messages
pub fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Check that `doc` is a mapping carrying every required key with the right shape
///
/// Every problem is collected; nothing short-circuits.
pub fn validate_required_keys(doc: &Value, required: &[RequiredKey]) -> Vec<String> {
    let Some(mapping) = doc.as_mapping() else {
        return vec![format!(
            "YAML must be a mapping at the top level, found a {}",
            describe_value(doc)
        )];
    };

    required
        .iter()
        .filter_map(|required| match mapping.get(required.key) {
            None => Some(format!("YAML is missing key \"{}\"", required.key)),
            Some(value) if !required.kind.matches(value) => Some(format!(
                "key \"{}\" appears to be a {}, expected {}",
                required.key,
                describe_value(value),
                required.kind
            )),
            Some(_) => None,
        })
        .collect()
}

/// A named transformation from one document shape to Envoy static resources
pub trait Processor: Send + Sync {
    /// Name the processor is selected by
    fn name(&self) -> &'static str;

    fn required_keys(&self) -> &'static [RequiredKey];

    /// Schema problems of `doc`; empty when the document can be transformed
    fn validate(&self, doc: &Value) -> Vec<String> {
        validate_required_keys(doc, self.required_keys())
    }

    /// Build listeners and clusters from a document that passed [`Processor::validate`]
    fn transform(&self, doc: &Value, settings: &EnvoySettings) -> Result<StaticResources>;
}

/// Constructor stored in the registry
pub type ProcessorFactory = fn() -> Box<dyn Processor>;

/// Processors known to this process, in registration order
#[derive(Debug, Clone, Default)]
pub struct ProcessorRegistry {
    entries: Vec<(&'static str, ProcessorFactory)>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the SNI proxy (the default) and the mTLS sidecar
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(sni_proxy::PROCESSOR_NAME, || Box::new(SniProxyProcessor))
            .register(mtls_sidecar::PROCESSOR_NAME, || Box::new(MtlsSidecarProcessor))
            .alias(sni_proxy::LEGACY_NAME, sni_proxy::PROCESSOR_NAME);
        registry
    }

    /// Add a processor; registering a name again replaces its factory in place
    pub fn register(&mut self, name: &'static str, factory: ProcessorFactory) -> &mut Self {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => {
                warn!(processor = name, "Processor registered twice; replacing factory");
                entry.1 = factory;
            }
            None => self.entries.push((name, factory)),
        }
        self
    }

    /// Make `alias` select the processor registered as `target`
    pub fn alias(&mut self, alias: &'static str, target: &'static str) -> &mut Self {
        match self.aliases.iter_mut().find(|(existing, _)| *existing == alias) {
            Some(entry) => entry.1 = target,
            None => self.aliases.push((alias, target)),
        }
        self
    }

    /// Aliases pointing at `name`
    pub fn aliases_of(&self, name: &str) -> Vec<&'static str> {
        self.aliases
            .iter()
            .filter(|(_, target)| *target == name)
            .map(|(alias, _)| *alias)
            .collect()
    }

    fn resolve<'a>(&self, name: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |(_, target)| *target)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    /// The first registered processor
    pub fn default_name(&self) -> Option<&'static str> {
        self.entries.first().map(|(name, _)| *name)
    }

    /// Instantiate the processor registered under `name` or one of its aliases
    pub fn create(&self, name: &str) -> Result<Box<dyn Processor>> {
        let resolved = self.resolve(name);
        self.entries
            .iter()
            .find(|(registered, _)| *registered == resolved)
            .map(|(_, factory)| factory())
            .ok_or_else(|| Error::UnknownProcessor {
                name: name.to_string(),
                available: self.names().into_iter().map(str::to_string).collect(),
            })
    }
}

/// Validate `doc` with `processor` and transform it when it is valid
pub fn run_pipeline(
    processor: &dyn Processor,
    doc: &Value,
    settings: &EnvoySettings,
) -> Result<StaticResources> {
    let span = synth_span!(processor.name());
    let _guard = span.enter();

    let errors = processor.validate(doc);
    if !errors.is_empty() {
        debug!(problems = errors.len(), "Document failed schema validation");
        return Err(Error::validation(errors));
    }

    let resources = processor.transform(doc, settings)?;
    info!(
        listeners = resources.listeners.len(),
        clusters = resources.clusters.len(),
        "Synthesized static resources"
    );
    Ok(resources)
}

/// Build an entity from a document value, reporting failures against `context`
pub(crate) fn entity_from_value<T>(value: &Value, context: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let entity: T = serde_yaml::from_value(value.clone())
        .map_err(|err| Error::construction(context, err.to_string()))?;

    entity
        .validate()
        .map_err(|errors| Error::construction(context, describe_validation_errors(&errors)))?;

    Ok(entity)
}
