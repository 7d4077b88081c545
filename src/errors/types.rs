//! # Error Types
//!
//! Error types for the configuration generator using `thiserror`.

use validator::{ValidationErrors, ValidationErrorsKind};

/// Custom result type for envoy-confgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the configuration generator
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Process settings could not be loaded or are invalid
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The input document failed schema validation. Every detected problem is
    /// carried so they can be reported together.
    #[error("{}", render_validation_errors(.errors))]
    Validation { errors: Vec<String> },

    /// A schema-valid document carried a field value that could not be turned
    /// into an entity (bad port, unknown proxy protocol token, ...)
    #[error("Invalid {context}: {message}")]
    Construction { context: String, message: String },

    /// No processor is registered under the requested name
    #[error("Unknown processor '{name}' (available: {})", .available.join(", "))]
    UnknownProcessor { name: String, available: Vec<String> },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn render_validation_errors(errors: &[String]) -> String {
    let mut out = String::from("The following problems were found:");
    for error in errors {
        out.push_str("\n  - ");
        out.push_str(error);
    }
    out
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a schema validation error from the aggregated problem list
    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    /// Create a construction error for a malformed field value
    pub fn construction<C: Into<String>, M: Into<String>>(context: C, message: M) -> Self {
        Self::Construction { context: context.into(), message: message.into() }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Problems reported by schema validation, empty for every other variant
    pub fn validation_errors(&self) -> &[String] {
        match self {
            Error::Validation { errors } => errors,
            _ => &[],
        }
    }

    /// Add context to an error
    pub(crate) fn add_context(mut self, context: &str) -> Self {
        match &mut self {
            Error::Io { context: ctx, .. } | Error::Serialization { context: ctx, .. } => {
                *ctx = format!("{}: {}", context, ctx);
            }
            Error::Construction { context: ctx, .. } => {
                *ctx = format!("{} {}", context, ctx);
            }
            Error::Internal(message) => {
                *message = format!("{}: {}", context, message);
            }
            _ => {}
        }
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            source: Box::new(error),
            context: "JSON serialization failed".to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            source: Box::new(error),
            context: "YAML parsing failed".to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<regex::Error> for Error {
    fn from(error: regex::Error) -> Self {
        Self::internal(format!("Generated pattern failed to compile: {}", error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::config(format!("Validation failed: {}", describe_validation_errors(&errors)))
    }
}

/// Flatten nested validator errors into `path: message` entries, sorted by path
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut entries = Vec::new();
    collect_validation_errors(errors, "", &mut entries);
    entries.sort();
    entries.join("; ")
}

fn collect_validation_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { field.to_string() } else { format!("{prefix}.{field}") };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| error.code.to_string(), |message| message.to_string());
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_errors(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::config("Test configuration error");
        assert!(matches!(error, Error::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error_lists_every_problem() {
        let error = Error::validation(vec![
            "YAML is missing key \"listeners\"".to_string(),
            "YAML is missing key \"backends\"".to_string(),
        ]);

        assert_eq!(error.validation_errors().len(), 2);
        assert_eq!(
            error.to_string(),
            "The following problems were found:\n  - YAML is missing key \"listeners\"\n  - YAML is missing key \"backends\""
        );
    }

    #[test]
    fn test_construction_error_context() {
        let error = Error::construction("backend", "missing field `host`").add_context("backends[2]:");
        assert_eq!(error.to_string(), "Invalid backends[2]: backend: missing field `host`");
        assert!(error.validation_errors().is_empty());
    }

    #[test]
    fn test_unknown_processor_message() {
        let error = Error::UnknownProcessor {
            name: "nope".to_string(),
            available: vec!["sni_proxy".to_string(), "mtls_sidecar".to_string()],
        };
        assert_eq!(error.to_string(), "Unknown processor 'nope' (available: sni_proxy, mtls_sidecar)");
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Serialization { .. }));

        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(matches!(error, Error::Serialization { .. }));
    }
}
