//! # Configuration Settings
//!
//! Process-wide settings for the generator: where the Envoy admin interface
//! binds, where generated filters write their access logs, and how the
//! generator itself logs.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::Result;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct Settings {
    /// Settings that end up inside the generated Envoy configuration
    #[validate(nested)]
    pub envoy: EnvoySettings,

    /// Logging of the generator process itself
    #[validate(nested)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;
        Ok(())
    }
}

/// Envoy-facing settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EnvoySettings {
    /// Address the Envoy admin interface binds to
    #[validate(length(min = 1, message = "Admin address cannot be empty"))]
    pub admin_address: String,

    /// Port the Envoy admin interface binds to
    #[validate(range(min = 1, max = 65535, message = "Admin port must be between 1 and 65535"))]
    pub admin_port: u32,

    /// File the generated HTTP and TCP proxy filters write access logs to
    #[validate(length(min = 1, message = "Access log path cannot be empty"))]
    pub access_log: String,
}

impl Default for EnvoySettings {
    fn default() -> Self {
        Self {
            admin_address: "127.0.0.1".to_string(),
            admin_port: 9901,
            access_log: "/dev/stdout".to_string(),
        }
    }
}

/// Logging configuration for the generator process
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level filter, overridden by `RUST_LOG`
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,

    /// `text` or `json`
    #[validate(custom(function = "validate_log_format"))]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "text".to_string() }
    }
}

impl LoggingSettings {
    /// Whether log lines should be emitted as JSON objects
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
        _ => Err(ValidationError::new("log_level")
            .with_message("Log level must be one of trace, debug, info, warn, error, off".into())),
    }
}

fn validate_log_format(format: &str) -> std::result::Result<(), ValidationError> {
    match format.to_ascii_lowercase().as_str() {
        "text" | "json" => Ok(()),
        _ => Err(ValidationError::new("log_format")
            .with_message("Log format must be either text or json".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_validation() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.envoy.admin_address, "127.0.0.1");
        assert_eq!(settings.envoy.admin_port, 9901);
        assert_eq!(settings.envoy.access_log, "/dev/stdout");
        assert!(!settings.logging.is_json());
    }

    #[test]
    fn test_settings_validation_errors() {
        let mut settings = Settings::default();
        settings.envoy.admin_port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.envoy.admin_port = 70000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.envoy.access_log = String::new();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_json_format_detection() {
        let logging = LoggingSettings { format: "JSON".to_string(), ..Default::default() };
        assert!(logging.is_json());
    }
}
