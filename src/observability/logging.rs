//! # Structured Logging
//!
//! Installs the `tracing` subscriber used by the command line front end and
//! provides span macros for the synthesis pipeline.
//!
//! Logs always go to stderr: stdout may carry the generated configuration.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;
use crate::errors::{Error, Result};

/// Create a tracing span covering one processor run
#[macro_export]
macro_rules! synth_span {
    ($processor:expr) => {
        tracing::info_span!("synthesize", processor = %$processor)
    };
    ($processor:expr, $($field:tt)*) => {
        tracing::info_span!("synthesize", processor = %$processor, $($field)*)
    };
}

/// Build the level filter: `RUST_LOG` wins, then `--verbose`, then settings
pub fn build_env_filter(settings: &LoggingSettings, verbose: bool) -> Result<EnvFilter> {
    if let Ok(directives) = std::env::var(EnvFilter::DEFAULT_ENV) {
        return EnvFilter::try_new(directives)
            .map_err(|e| Error::config(format!("Invalid RUST_LOG directives: {}", e)));
    }

    let level = if verbose { "debug" } else { settings.level.as_str() };
    EnvFilter::try_new(level).map_err(|e| Error::config(format!("Invalid log level: {}", e)))
}

/// Install the global subscriber
pub fn init_logging(settings: &LoggingSettings, verbose: bool) -> Result<()> {
    let filter = build_env_filter(settings, verbose)?;

    let result = if settings.is_json() {
        tracing::subscriber::set_global_default(
            fmt().json().with_env_filter(filter).with_writer(std::io::stderr).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt().with_env_filter(filter).with_writer(std::io::stderr).finish(),
        )
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed; keeping it");
    }
    Ok(())
}

/// Log the effective settings at startup
pub fn log_settings_info(settings: &crate::config::Settings) {
    tracing::debug!(
        admin_address = %settings.envoy.admin_address,
        admin_port = settings.envoy.admin_port,
        access_log = %settings.envoy.access_log,
        log_format = %settings.logging.format,
        "Effective generator settings"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macros_compile() {
        let _span = synth_span!("sni_proxy");
        let _span = synth_span!("sni_proxy", listeners = 2, backends = 3);
    }

    #[test]
    fn test_verbose_filter_builds() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let settings = LoggingSettings::default();
        let filter = build_env_filter(&settings, true).expect("filter");
        assert_eq!(filter.to_string(), "debug");
    }
}
