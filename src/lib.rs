//! # envoy-confgen
//!
//! Compiles small declarative YAML descriptions into fully expanded, static
//! Envoy bootstrap configurations.
//!
//! ## Architecture
//!
//! ```text
//! YAML document → Processor (validate → entities) → xDS synthesizers → Bootstrap → pb / summary
//! ```
//!
//! Two processors ship:
//!
//! - **sni_proxy**: a non-terminating reverse proxy routing HTTPS on SNI and
//!   HTTP on the `Host` header, optionally speaking the PROXY protocol upstream
//! - **mtls_sidecar**: a sidecar terminating mutual TLS, validating client
//!   certificate SANs against DNS and SPIFFE patterns and forwarding plain HTTP
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use envoy_confgen::{config::EnvoySettings, processors::{run_pipeline, ProcessorRegistry}};
//! use envoy_confgen::xds::generate_bootstrap;
//!
//! # fn main() -> envoy_confgen::Result<()> {
//! let doc: serde_yaml::Value = serde_yaml::from_str("listeners: []\nbackends: []\n")?;
//! let registry = ProcessorRegistry::builtin();
//! let processor = registry.create("sni_proxy")?;
//! let settings = EnvoySettings::default();
//!
//! let resources = run_pipeline(processor.as_ref(), &doc, &settings)?;
//! let bootstrap = generate_bootstrap(resources, &settings);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod output;
pub mod processors;
pub mod xds;

// Re-export commonly used types and traits
pub use config::{EnvoySettings, Settings};
pub use errors::{Error, Result};
pub use processors::{run_pipeline, Processor, ProcessorRegistry};
pub use xds::{generate_bootstrap, StaticResources};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "envoy-confgen");
    }
}
