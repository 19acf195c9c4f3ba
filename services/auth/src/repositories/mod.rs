//! Credential stores
//!
//! Every backend implements [`CredentialStore`]. Failures come back as
//! [`DatabaseError`]: only `NotFound` and `Constraint` carry meaning for
//! callers, anything else is passed through as an opaque store failure.

use std::sync::Arc;

use async_trait::async_trait;
use common::database::{self, Connector, ConnectorRegistry, DatabaseConfig, DatabaseKind};
use common::error::DatabaseResult;
use tracing::info;
use uuid::Uuid;

use crate::models::User;
use crate::query::UserFilter;

pub mod memory;
pub mod user;

pub use memory::InMemoryUserRepository;
pub use user::SqliteUserRepository;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user. The store assigns `id`, `created` and `modified`.
    async fn create(&self, user: User) -> DatabaseResult<User>;

    async fn get(&self, id: Uuid) -> DatabaseResult<User>;

    async fn get_by_username(&self, username: &str) -> DatabaseResult<User>;

    async fn get_all(&self) -> DatabaseResult<Vec<User>>;

    /// Replace the record stored under `id`. The record may carry a new ID.
    async fn update(&self, id: Uuid, user: User) -> DatabaseResult<User>;

    /// Remove a user and return its last state
    async fn delete(&self, id: Uuid) -> DatabaseResult<User>;

    /// Users matching `filter`
    async fn find(&self, filter: &UserFilter) -> DatabaseResult<Vec<User>> {
        let users = self.get_all().await?;
        Ok(users.into_iter().filter(|u| filter.matches(u)).collect())
    }

    /// Release the backend's resources
    async fn close(&self) -> DatabaseResult<()> {
        Ok(())
    }
}

pub type SharedStore = Arc<dyn CredentialStore>;

/// Opens an in-memory store; the config carries nothing it needs
pub struct InMemConnector;

#[async_trait]
impl Connector<SharedStore> for InMemConnector {
    async fn connect(&self, _config: &DatabaseConfig) -> DatabaseResult<SharedStore> {
        info!("Opening in-memory credential store");
        Ok(Arc::new(InMemoryUserRepository::new()))
    }
}

/// Opens (and migrates) a SQLite file store
pub struct SqliteConnector;

#[async_trait]
impl Connector<SharedStore> for SqliteConnector {
    async fn connect(&self, config: &DatabaseConfig) -> DatabaseResult<SharedStore> {
        let pool = database::init_pool(config).await?;
        let repo = SqliteUserRepository::new(pool);
        repo.migrate().await?;
        Ok(Arc::new(repo))
    }
}

/// Registry knowing every credential store kind this crate ships
pub fn connector_registry() -> ConnectorRegistry<SharedStore> {
    let mut registry = ConnectorRegistry::new();
    registry
        .register(DatabaseKind::InMem, InMemConnector)
        .register(DatabaseKind::Sqlite, SqliteConnector);
    registry
}
