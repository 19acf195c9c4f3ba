//! Login service
//!
//! Business rules of the username/password subsystem on top of any
//! [`CredentialStore`]. Every failure leaving this module is an
//! [`AuthError`]; store errors are classified on the way out.

use std::sync::Arc;

use common::error::DatabaseError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{Role, User, now};
use crate::password::{PasswordError, PasswordHashing};
use crate::query::UserFilter;
use crate::repositories::{CredentialStore, SharedStore};
use crate::validation::{optional_email, parse_id, validate_password, validate_username};

#[derive(Clone)]
pub struct LoginService {
    store: SharedStore,
    hasher: PasswordHashing,
}

impl LoginService {
    pub fn new(store: SharedStore) -> Self {
        Self::with_hasher(store, PasswordHashing::default())
    }

    pub fn with_hasher(store: SharedStore, hasher: PasswordHashing) -> Self {
        Self { store, hasher }
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn shared_store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    // Hashing is CPU-bound, keep it off the async workers
    async fn hash_password(&self, password: &str) -> AuthResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(AuthError::store)
    }

    async fn verify_password(&self, password: &str, stored: &str) -> AuthResult<()> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored = stored.to_string();
        let outcome = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {}", e)))?;

        match outcome {
            Ok(()) => Ok(()),
            Err(PasswordError::Mismatch) => Err(AuthError::BadCredentials),
            Err(e) => Err(AuthError::store(e)),
        }
    }

    /// Check a username and password and record the login time
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<User> {
        let mut user = match self.store.get_by_username(username).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound) => {
                info!("Login attempt for unknown user '{}'", username);
                return Err(AuthError::BadCredentials);
            }
            Err(e) => return Err(AuthError::store(e)),
        };

        if let Err(e) = self.verify_password(password, &user.password_hash).await {
            if matches!(e, AuthError::BadCredentials) {
                info!("Wrong password for user '{}'", username);
            }
            return Err(e);
        }

        user.last_login = Some(now());
        let user = self
            .store
            .update(user.id, user)
            .await
            .map_err(AuthError::store)?;

        info!("User '{}' logged in", user.username);
        Ok(user)
    }

    /// Record a logout; tokens issued before it stop validating
    pub async fn logout(&self, id: Uuid) -> AuthResult<User> {
        let mut user = self.store.get(id).await?;
        user.last_logout = Some(now());
        let user = self
            .store
            .update(id, user)
            .await
            .map_err(AuthError::store)?;

        info!("User '{}' logged out", user.username);
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> AuthResult<User> {
        let id = parse_id(id)?;
        Ok(self.store.get(id).await?)
    }

    pub async fn get_user_by_username(&self, username: &str) -> AuthResult<User> {
        Ok(self.store.get_by_username(username).await?)
    }

    pub async fn get_all_users(&self) -> AuthResult<Vec<User>> {
        Ok(self.store.get_all().await?)
    }

    pub async fn find_users(&self, filter: &UserFilter) -> AuthResult<Vec<User>> {
        Ok(self.store.find(filter).await?)
    }

    /// Fails with `AlreadyExists` when `username` is taken by anyone
    async fn ensure_username_free(&self, username: &str) -> AuthResult<()> {
        match self.store.get_by_username(username).await {
            Ok(_) => Err(AuthError::AlreadyExists(format!(
                "username '{}' is already taken",
                username
            ))),
            Err(DatabaseError::NotFound) => Ok(()),
            Err(e) => Err(AuthError::store(e)),
        }
    }

    /// Register a new user. An empty `email` means none.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
        role: Role,
    ) -> AuthResult<User> {
        validate_username(username).map_err(AuthError::BadArgument)?;
        validate_password(password).map_err(AuthError::BadArgument)?;
        let email = optional_email(email)?;

        self.ensure_username_free(username).await?;

        let hash = self.hash_password(password).await?;
        let user = self
            .store
            .create(User::new(username, hash, role).with_email(email))
            .await?;

        info!("Created user '{}' ({}) as {}", user.username, user.id, user.role);
        Ok(user)
    }

    /// Change identity fields of a user; the password is left alone
    pub async fn update_user(
        &self,
        current_id: &str,
        new_id: &str,
        username: &str,
        email: &str,
        role: Role,
    ) -> AuthResult<User> {
        validate_username(username).map_err(AuthError::BadArgument)?;
        let email = optional_email(email)?;
        let current_id = parse_id(current_id)?;
        let new_id = parse_id(new_id)?;

        let current = self.store.get(current_id).await?;

        if new_id != current_id {
            match self.store.get(new_id).await {
                Ok(_) => {
                    return Err(AuthError::AlreadyExists(format!(
                        "user ID {} is already in use",
                        new_id
                    )));
                }
                Err(DatabaseError::NotFound) => {}
                Err(e) => return Err(AuthError::store(e)),
            }
        }
        if username != current.username {
            self.ensure_username_free(username).await?;
        }

        let record = User {
            id: new_id,
            username: username.to_string(),
            email,
            role,
            ..current
        };
        let user = self.store.update(current_id, record).await?;

        if new_id != current_id {
            info!("User {} moved to ID {}", current_id, new_id);
        }
        info!("Updated user '{}' ({})", user.username, user.id);
        Ok(user)
    }

    /// Replace a user's password, leaving every other field untouched
    pub async fn update_password(&self, id: &str, password: &str) -> AuthResult<User> {
        validate_password(password).map_err(AuthError::BadArgument)?;
        let id = parse_id(id)?;

        let mut user = self.store.get(id).await?;
        user.password_hash = self.hash_password(password).await?;
        let user = self.store.update(id, user).await?;

        info!("Changed password of user '{}'", user.username);
        Ok(user)
    }

    /// Remove a user and return the record as it was
    pub async fn delete_user(&self, id: &str) -> AuthResult<User> {
        let id = parse_id(id)?;
        let user = self.store.delete(id).await?;

        info!("Deleted user '{}' ({})", user.username, user.id);
        Ok(user)
    }

    /// Make sure `username` exists as an admin with `password`
    pub async fn ensure_admin(&self, username: &str, password: &str) -> AuthResult<User> {
        match self.store.get_by_username(username).await {
            Ok(mut user) => {
                validate_password(password).map_err(AuthError::BadArgument)?;
                if user.role != Role::Admin {
                    warn!("Promoting existing user '{}' to admin", username);
                    user.role = Role::Admin;
                }
                user.password_hash = self.hash_password(password).await?;
                Ok(self.store.update(user.id, user).await?)
            }
            Err(DatabaseError::NotFound) => {
                self.create_user(username, password, "", Role::Admin).await
            }
            Err(e) => Err(AuthError::store(e)),
        }
    }
}
