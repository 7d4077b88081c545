//! # Error Handling
//!
//! Error types shared by the synthesis engine, the processor pipeline and the
//! command line front end.

pub mod types;

pub use types::{describe_validation_errors, Error, Result};
