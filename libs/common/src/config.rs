//! Configuration loading for jelly servers
//!
//! Configuration comes from a YAML or JSON file (format picked by extension)
//! layered under environment variables such as `JELLY__SERVER__PORT=9000`.
//! Every section has defaults, so an empty file is a valid configuration.

use config::{Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::database::DatabaseConfig;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "JELLY";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid '{api}' section: {source}")]
    Section {
        api: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
    /// Named databases that APIs refer to in their `uses` list
    #[serde(default)]
    pub dbs: HashMap<String, DatabaseConfig>,
    /// Per-component sections keyed by component name
    #[serde(default)]
    pub apis: HashMap<String, ApiConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix every component is mounted under
    #[serde(default = "default_base")]
    pub base: String,
    /// Delay applied before answering 401, 403 and 500
    #[serde(default = "default_unauth_delay_ms")]
    pub unauth_delay_ms: u64,
}

fn default_address() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base() -> String {
    "/".to_string()
}

fn default_unauth_delay_ms() -> u64 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            base: default_base(),
            unauth_delay_ms: default_unauth_delay_ms(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn unauth_delay(&self) -> Duration {
        Duration::from_millis(self.unauth_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "auth=debug,info"
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Section shared by every component; component-specific keys land in `extra`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Mount point relative to the server base; defaults to "/<name>"
    #[serde(default)]
    pub base: Option<String>,
    /// Names of entries in `dbs` this component needs
    #[serde(default)]
    pub uses: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base: None,
            uses: Vec::new(),
            extra: HashMap::new(),
        }
    }
}

impl ApiConfig {
    /// Deserialize the component-specific keys into `T`
    pub fn section<T: DeserializeOwned>(&self, api: &str) -> Result<T, ConfigError> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).map_err(|source| {
            ConfigError::Section {
                api: api.to_string(),
                source,
            }
        })
    }

    /// Mount point for the component called `name`
    pub fn base_for(&self, name: &str) -> String {
        match self.base.as_deref() {
            Some(base) => normalize_base(base),
            None => format!("/{}", name),
        }
    }
}

/// Ensure a leading slash and strip any trailing one ("/" stays "/")
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl Config {
    /// Load configuration from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn api(&self, name: &str) -> Option<&ApiConfig> {
        self.apis.get(name)
    }

    /// Check cross-section consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }

        for (name, db) in &self.dbs {
            db.validate()
                .map_err(|e| ConfigError::Invalid(format!("dbs.{}: {}", name, e)))?;
        }

        for (name, api) in &self.apis {
            if !api.enabled {
                continue;
            }
            for used in &api.uses {
                if !self.dbs.contains_key(used) {
                    return Err(ConfigError::Invalid(format!(
                        "apis.{} uses undeclared database '{}'",
                        name, used
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseKind;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_address(), "localhost:8080");
        assert_eq!(config.server.unauth_delay(), Duration::from_secs(1));
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base(""), "/");
        assert_eq!(normalize_base("/"), "/");
        assert_eq!(normalize_base("auth"), "/auth");
        assert_eq!(normalize_base("/v1/auth/"), "/v1/auth");
    }

    #[test]
    fn test_api_base_defaults_to_name() {
        let api = ApiConfig::default();
        assert_eq!(api.base_for("echo"), "/echo");
    }

    #[test]
    fn test_uses_must_reference_declared_db() {
        let mut config = Config::default();
        config.apis.insert(
            "auth".to_string(),
            ApiConfig {
                uses: vec!["users".to_string()],
                ..ApiConfig::default()
            },
        );
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config
            .dbs
            .insert("users".to_string(), DatabaseConfig::in_memory());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_api_is_not_checked() {
        let mut config = Config::default();
        config.apis.insert(
            "auth".to_string(),
            ApiConfig {
                enabled: false,
                uses: vec!["missing".to_string()],
                ..ApiConfig::default()
            },
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_section_reads_extra_keys() {
        #[derive(Deserialize)]
        struct Hello {
            rudeness: f64,
        }

        let mut api = ApiConfig::default();
        api.extra
            .insert("rudeness".to_string(), serde_json::json!(0.25));
        let hello: Hello = api.section("hello").unwrap();
        assert_eq!(hello.rudeness, 0.25);
    }

    #[test]
    fn test_section_error_names_the_api() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct NeedsSecret {
            secret: String,
        }

        let err = ApiConfig::default()
            .section::<NeedsSecret>("auth")
            .unwrap_err();
        assert!(err.to_string().contains("'auth'"));
    }

    #[test]
    fn test_database_section_deserializes() {
        let db: DatabaseConfig =
            serde_json::from_value(serde_json::json!({"type": "sqlite", "dir": "./db"})).unwrap();
        assert_eq!(db.kind, DatabaseKind::Sqlite);
        assert_eq!(db.max_connections, 5);
    }
}
