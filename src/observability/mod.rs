//! # Observability
//!
//! Structured logging for the generator. The generator is a short-lived batch
//! process, so logging is the only observability surface it carries.

pub mod logging;

pub use logging::{init_logging, log_settings_info};
