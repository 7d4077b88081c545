//! # Configuration Management
//!
//! Loads process-wide [`Settings`] once at startup. Sources are layered, later
//! ones winning:
//!
//! 1. built-in defaults
//! 2. the first settings file found on the search path, or an explicit path
//! 3. `ENVOY_CONFGEN__<SECTION>__<KEY>` environment variables
//!
//! The resulting value is passed by reference to whatever needs it; there is no
//! global settings singleton.

pub mod settings;

pub use settings::{EnvoySettings, LoggingSettings, Settings};

use std::path::{Path, PathBuf};

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use tracing::debug;

use crate::errors::{Error, Result};

/// Prefix of environment variables that override settings
pub const ENV_PREFIX: &str = "ENVOY_CONFGEN";

/// Files probed, in order, when no explicit settings path is given
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("conf").join("envoy-confgen.toml"));
    }
    paths.push(PathBuf::from("/etc/envoy/confgen.toml"));
    paths
}

impl Settings {
    /// Load settings from the default search path and the environment
    pub fn load() -> Result<Self> {
        let found = default_search_paths().into_iter().find(|p| p.is_file());
        Self::load_layers(found.as_deref())
    }

    /// Load settings from an explicit file, which must exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::config(format!("Cannot read settings file: {}", path.display())));
        }
        Self::load_layers(Some(path))
    }

    fn load_layers(file: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = file {
            debug!(path = %path.display(), "Loading settings file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }
}
