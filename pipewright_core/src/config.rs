//! Engine configuration
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables prefixed with `PIPEWRIGHT_`. Nested keys use a
//! double underscore, e.g. `PIPEWRIGHT_FILESYSTEM__PRETTY_JSON=true`.

use crate::Result;
use crate::error::ValidationError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables read by [`ConfigLoader`]
pub const ENV_PREFIX: &str = "PIPEWRIGHT_";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub filesystem: FileSystemConfig,
}

/// Settings of the filesystem context
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FileSystemConfig {
    /// Prefix of the numbered stage folders (`stage_0`, `stage_1`, ...)
    pub input_prefix: String,
    /// Write indented JSON
    pub pretty_json: bool,
    /// Name given to the source of producer output in file names
    pub source_label: String,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            input_prefix: "stage_".to_string(),
            pretty_json: false,
            source_label: crate::enhance::DEFAULT_SOURCE_LABEL.to_string(),
        }
    }
}

impl FileSystemConfig {
    /// Name of the folder stage `index` reads from
    pub fn stage_folder(&self, index: usize) -> String {
        format!("{}{index}", self.input_prefix)
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let fs = &self.filesystem;
        if fs.input_prefix.trim().is_empty() {
            return Err(ValidationError::invalid_configuration(
                "filesystem.input_prefix must not be empty",
            )
            .into());
        }
        if fs.input_prefix.contains(['/', '\\']) {
            return Err(ValidationError::invalid_configuration(
                "filesystem.input_prefix must not contain path separators",
            )
            .into());
        }
        if fs.source_label.trim().is_empty() {
            return Err(ValidationError::invalid_configuration(
                "filesystem.source_label must not be empty",
            )
            .into());
        }
        Ok(())
    }
}

/// Loads [`EngineConfig`] from its layers
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader without a configuration file
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader reading `path` when it exists
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load and validate the configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<EngineConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(EngineConfig::default()));

        // Layer 2: Config file (if exists)
        if let Some(path) = self.config_path.as_deref().filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: EngineConfig = figment.extract().map_err(|e| {
            ValidationError::invalid_configuration(&format!("Failed to load configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }
}
