//! Process-local credential store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::CredentialStore;
use crate::models::{User, now};
use crate::query::UserFilter;

/// Users kept in a map behind one lock. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_hash(user: &User) -> DatabaseResult<()> {
    if user.password_hash.is_empty() {
        return Err(DatabaseError::Invalid(
            "refusing to store a user without a password hash".to_string(),
        ));
    }
    Ok(())
}

fn username_taken(users: &HashMap<Uuid, User>, username: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.username == username && Some(u.id) != except)
}

fn sorted(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
    users
}

#[async_trait]
impl CredentialStore for InMemoryUserRepository {
    async fn create(&self, mut user: User) -> DatabaseResult<User> {
        check_hash(&user)?;

        let mut users = self.users.write().await;
        if username_taken(&users, &user.username, None) {
            return Err(DatabaseError::Constraint(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        user.id = Uuid::new_v4();
        while users.contains_key(&user.id) {
            user.id = Uuid::new_v4();
        }
        let stamp = now();
        user.created = stamp;
        user.modified = stamp;

        debug!("Stored user {} in memory", user.id);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> DatabaseResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(DatabaseError::NotFound)
    }

    async fn get_all(&self) -> DatabaseResult<Vec<User>> {
        Ok(sorted(self.users.read().await.values().cloned().collect()))
    }

    async fn update(&self, id: Uuid, mut user: User) -> DatabaseResult<User> {
        check_hash(&user)?;

        let mut users = self.users.write().await;
        let current = users.get(&id).ok_or(DatabaseError::NotFound)?;
        if user.id != id && users.contains_key(&user.id) {
            return Err(DatabaseError::Constraint(format!(
                "user ID {} is already in use",
                user.id
            )));
        }
        if username_taken(&users, &user.username, Some(id)) {
            return Err(DatabaseError::Constraint(format!(
                "username '{}' is already taken",
                user.username
            )));
        }

        user.created = current.created;
        user.modified = now();
        users.remove(&id);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<User> {
        self.users
            .write()
            .await
            .remove(&id)
            .ok_or(DatabaseError::NotFound)
    }

    async fn find(&self, filter: &UserFilter) -> DatabaseResult<Vec<User>> {
        let limits = filter.index_limits();
        if limits.is_impossible() {
            return Ok(Vec::new());
        }

        let users = self.users.read().await;
        Ok(sorted(
            users
                .values()
                .filter(|u| limits.contains(&u.created) && filter.matches(u))
                .cloned()
                .collect(),
        ))
    }
}
