//! Database module for handling SQLite connections and connector selection
//!
//! This module provides store configuration, SQLite connection pooling and
//! health checks, and an explicit registry that maps a configured database
//! kind to the connector able to open it.

use crate::error::{DatabaseError, DatabaseResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{error, info};

/// Backing store flavours understood by the connector registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    /// Volatile store held in process memory
    #[serde(alias = "memory", alias = "inmemory")]
    InMem,
    /// SQLite file on disk
    Sqlite,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::InMem => write!(f, "inmem"),
            DatabaseKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Database configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Which connector opens this database
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    /// Directory holding the database file (sqlite only)
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// File name inside `dir` (sqlite only, default: "data.db")
    #[serde(default)]
    pub file: Option<String>,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            kind: DatabaseKind::InMem,
            dir: None,
            file: None,
            max_connections: default_max_connections(),
        }
    }

    pub fn sqlite(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            dir: Some(dir.into()),
            file: None,
            max_connections: default_max_connections(),
        }
    }

    /// Full path of the SQLite file
    pub fn sqlite_path(&self) -> DatabaseResult<PathBuf> {
        let dir = self.dir.as_ref().ok_or_else(|| {
            DatabaseError::Configuration("sqlite database requires a 'dir'".to_string())
        })?;
        let file = self.file.as_deref().unwrap_or("data.db");
        Ok(dir.join(file))
    }

    pub fn validate(&self) -> DatabaseResult<()> {
        if self.max_connections == 0 {
            return Err(DatabaseError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.kind == DatabaseKind::Sqlite {
            self.sqlite_path()?;
        }
        Ok(())
    }
}

/// Initialize a SQLite connection pool, creating the file if it is missing
///
/// # Arguments
///
/// * `config` - Database configuration
///
/// # Returns
///
/// * `DatabaseResult<SqlitePool>` - SQLite connection pool or error
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let path = config.sqlite_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::Configuration(format!(
                "cannot create database directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    info!("Opening SQLite database at {}", path.display());

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connection)?;

    Ok(pool)
}

/// Initialize a private in-memory SQLite database
///
/// The pool holds exactly one connection that never expires: every new
/// connection to `sqlite::memory:` would see a fresh, empty database.
pub async fn init_memory_pool() -> DatabaseResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Connection)
}

/// Check database connectivity
///
/// # Arguments
///
/// * `pool` - SQLite connection pool
///
/// # Returns
///
/// * `DatabaseResult<bool>` - True if connection is successful, false otherwise
pub async fn health_check(pool: &SqlitePool) -> DatabaseResult<bool> {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Ok(true),
        Err(e) => {
            error!("Database health check failed: {}", e);
            Ok(false)
        }
    }
}

/// Opens a store of type `T` from its configuration
#[async_trait]
pub trait Connector<T: Send>: Send + Sync {
    async fn connect(&self, config: &DatabaseConfig) -> DatabaseResult<T>;
}

/// Registry of connectors keyed by database kind
///
/// Built once at startup and handed to whatever needs to open stores.
pub struct ConnectorRegistry<T: Send> {
    connectors: HashMap<DatabaseKind, Box<dyn Connector<T>>>,
}

impl<T: Send> Default for ConnectorRegistry<T> {
    fn default() -> Self {
        Self {
            connectors: HashMap::new(),
        }
    }
}

impl<T: Send> ConnectorRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector, replacing any previous one for the same kind
    pub fn register<C>(&mut self, kind: DatabaseKind, connector: C) -> &mut Self
    where
        C: Connector<T> + 'static,
    {
        if self.connectors.insert(kind, Box::new(connector)).is_some() {
            info!("Replaced connector for database kind {}", kind);
        }
        self
    }

    pub fn is_registered(&self, kind: DatabaseKind) -> bool {
        self.connectors.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<DatabaseKind> {
        self.connectors.keys().copied().collect()
    }

    /// Open the store described by `config`
    pub async fn connect(&self, config: &DatabaseConfig) -> DatabaseResult<T> {
        config.validate()?;
        let connector = self.connectors.get(&config.kind).ok_or_else(|| {
            DatabaseError::Configuration(format!(
                "no connector registered for database type '{}'",
                config.kind
            ))
        })?;
        connector.connect(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Connector<String> for Named {
        async fn connect(&self, config: &DatabaseConfig) -> DatabaseResult<String> {
            Ok(format!("{}:{}", self.0, config.kind))
        }
    }

    #[tokio::test]
    async fn test_registry_dispatches_on_kind() {
        let mut registry = ConnectorRegistry::new();
        registry.register(DatabaseKind::InMem, Named("first"));

        let opened = registry.connect(&DatabaseConfig::in_memory()).await.unwrap();
        assert_eq!(opened, "first:inmem");
    }

    #[tokio::test]
    async fn test_registry_replaces_existing_connector() {
        let mut registry = ConnectorRegistry::new();
        registry
            .register(DatabaseKind::InMem, Named("first"))
            .register(DatabaseKind::InMem, Named("second"));

        let opened = registry.connect(&DatabaseConfig::in_memory()).await.unwrap();
        assert_eq!(opened, "second:inmem");
        assert_eq!(registry.kinds(), vec![DatabaseKind::InMem]);
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_a_configuration_error() {
        let registry: ConnectorRegistry<String> = ConnectorRegistry::new();
        let err = registry
            .connect(&DatabaseConfig::sqlite("/tmp/jelly"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Configuration(_)));
    }

    #[test]
    fn test_sqlite_path_defaults_file_name() {
        let config = DatabaseConfig::sqlite("/var/lib/jelly");
        assert_eq!(
            config.sqlite_path().unwrap(),
            PathBuf::from("/var/lib/jelly/data.db")
        );
    }

    #[test]
    fn test_sqlite_without_dir_is_invalid() {
        let mut config = DatabaseConfig::sqlite("x");
        config.dir = None;
        assert!(config.validate().is_err());
        assert!(DatabaseConfig::in_memory().validate().is_ok());
    }

    #[test]
    fn test_kind_accepts_aliases() {
        let kind: DatabaseKind = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(kind, DatabaseKind::InMem);
        let kind: DatabaseKind = serde_json::from_str("\"sqlite\"").unwrap();
        assert_eq!(kind, DatabaseKind::Sqlite);
    }
}
