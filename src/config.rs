//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. CLI arguments
//!
//! The `[spec]` section carries what [`openapi::setup`](crate::openapi::setup)
//! needs to describe the API; `title` and `version` have no defaults and must
//! come from one of the layers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub spec: Spec,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// OpenAPI document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_openapi_version")]
    pub openapi_version: String,
    /// Path the document is served at.
    #[serde(default = "default_spec_path")]
    pub path: String,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            title: String::new(),
            version: String::new(),
            description: String::new(),
            openapi_version: default_openapi_version(),
            path: default_spec_path(),
        }
    }
}

impl Spec {
    /// Spec settings with the required fields set and defaults elsewhere.
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Check the fields that have no usable default.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Config("spec.title must be set".into()));
        }
        if self.version.trim().is_empty() {
            return Err(Error::Config("spec.version must be set".into()));
        }
        if !self.path.starts_with('/') {
            return Err(Error::Config(format!(
                "spec.path must start with '/', got '{}'",
                self.path
            )));
        }
        Ok(())
    }
}

fn default_openapi_version() -> String {
    "3.0.2".to_string()
}

fn default_spec_path() -> String {
    "/api/spec.json".to_string()
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix (e.g., "MYAPP" -> MYAPP_HOST, MYAPP_SPEC_PATH)
    pub env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            env_prefix: "ROUTEDOC".to_string(),
        }
    }
}

impl ConfigLoader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
        }
    }

    /// Load configuration from file, environment, and CLI arguments.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `cli_host` - CLI override for host
    /// * `cli_port` - CLI override for port
    /// * `cli_spec_path` - CLI override for the path the document is served at
    pub fn load(
        &self,
        config_path: Option<&Path>,
        cli_host: Option<&str>,
        cli_port: Option<u16>,
        cli_spec_path: Option<&str>,
    ) -> crate::Result<Config> {
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config::default()
        };

        let prefix = &self.env_prefix;
        let env = |name: &str| std::env::var(format!("{prefix}_{name}")).ok();

        if let Some(host) = env("HOST") {
            config.server.host = host;
        }
        if let Some(port) = env("PORT")
            && let Ok(p) = port.parse()
        {
            config.server.port = p;
        }
        if let Some(title) = env("SPEC_TITLE") {
            config.spec.title = title;
        }
        if let Some(version) = env("SPEC_VERSION") {
            config.spec.version = version;
        }
        if let Some(path) = env("SPEC_PATH") {
            config.spec.path = path;
        }

        if let Some(host) = cli_host {
            config.server.host = host.to_string();
        }
        if let Some(port) = cli_port {
            config.server.port = port;
        }
        if let Some(path) = cli_spec_path {
            config.spec.path = path.to_string();
        }

        config.spec.validate()?;

        Ok(config)
    }
}
