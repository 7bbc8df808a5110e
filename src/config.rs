//! Configuration loading
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file
//! (`gqlplus.toml`, or the path given by `--config` / `GQLPLUS_CONFIG_PATH`),
//! then `GQLPLUS_` environment variables such as
//! `GQLPLUS_GRAPHQL__ENDPOINT`. A `.env` file is loaded first if present.
//! Builder overrides win over everything.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::MAX_LOOP_ITERATIONS;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gqlplus.toml";
/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "GQLPLUS_CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/graphql".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_loop_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: MAX_LOOP_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graphql: GraphqlConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load from the default sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.graphql.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "graphql.endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
        if self.graphql.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "graphql.timeout_secs must be positive".to_string(),
            ));
        }
        if self.engine.max_loop_iterations == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_loop_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Programmatic overrides applied on top of the loaded sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    max_loop_iterations: Option<usize>,
}

impl ConfigBuilder {
    /// Explicit config file; unlike the default file it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn max_loop_iterations(mut self, limit: Option<usize>) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();

        let (path, required) = match self
            .config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        {
            Some(path) => (path, true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config: Config = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Config::default())?)
            .add_source(::config::File::from(path).required(required))
            .add_source(
                ::config::Environment::with_prefix("GQLPLUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(endpoint) = self.endpoint {
            config.graphql.endpoint = endpoint;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.graphql.timeout_secs = timeout_secs;
        }
        if let Some(limit) = self.max_loop_iterations {
            config.engine.max_loop_iterations = limit;
        }

        config.validate()?;
        Ok(config)
    }
}
