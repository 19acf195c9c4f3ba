//! SQLite-backed credential store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::info;
use uuid::Uuid;

use super::CredentialStore;
use crate::models::{Role, User, now};
use crate::query::UserFilter;

const COLUMNS: &str =
    "id, username, password_hash, email, role, created, modified, last_login, last_logout";

/// User repository over a `users` table.
///
/// Timestamps are stored as Unix microseconds, IDs as hyphenated text.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `users` table and its index if they do not exist yet
    pub async fn migrate(&self) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY NOT NULL,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                email TEXT,
                role INTEGER NOT NULL,
                created INTEGER NOT NULL,
                modified INTEGER NOT NULL,
                last_login INTEGER,
                last_logout INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS users_created ON users (created)")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Users table is ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(value: i64) -> DatabaseResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| DatabaseError::Invalid(format!("timestamp {} is out of range", value)))
}

fn user_from_row(row: &SqliteRow) -> DatabaseResult<User> {
    let id: String = row.try_get("id").map_err(DatabaseError::Query)?;
    let role: i64 = row.try_get("role").map_err(DatabaseError::Query)?;
    let created: i64 = row.try_get("created").map_err(DatabaseError::Query)?;
    let modified: i64 = row.try_get("modified").map_err(DatabaseError::Query)?;
    let last_login: Option<i64> = row.try_get("last_login").map_err(DatabaseError::Query)?;
    let last_logout: Option<i64> = row.try_get("last_logout").map_err(DatabaseError::Query)?;

    Ok(User {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::Invalid(format!("stored ID '{}': {}", id, e)))?,
        username: row.try_get("username").map_err(DatabaseError::Query)?,
        password_hash: row.try_get("password_hash").map_err(DatabaseError::Query)?,
        email: row.try_get("email").map_err(DatabaseError::Query)?,
        role: Role::from_value(role)
            .ok_or_else(|| DatabaseError::Invalid(format!("unknown role value {}", role)))?,
        created: from_micros(created)?,
        modified: from_micros(modified)?,
        last_login: last_login.map(from_micros).transpose()?,
        last_logout: last_logout.map(from_micros).transpose()?,
    })
}

fn users_from_rows(rows: &[SqliteRow]) -> DatabaseResult<Vec<User>> {
    rows.iter().map(user_from_row).collect()
}

fn check_hash(user: &User) -> DatabaseResult<()> {
    if user.password_hash.is_empty() {
        return Err(DatabaseError::Invalid(
            "refusing to store a user without a password hash".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl CredentialStore for SqliteUserRepository {
    async fn create(&self, mut user: User) -> DatabaseResult<User> {
        check_hash(&user)?;

        user.id = Uuid::new_v4();
        let stamp = now();
        user.created = stamp;
        user.modified = stamp;

        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        ))
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.role.value())
        .bind(micros(user.created))
        .bind(micros(user.modified))
        .bind(user.last_login.map(micros))
        .bind(user.last_logout.map(micros))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        info!("Inserted user {}", user.id);
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<User> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", COLUMNS))
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        user_from_row(&row)
    }

    async fn get_by_username(&self, username: &str) -> DatabaseResult<User> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", COLUMNS))
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        user_from_row(&row)
    }

    async fn get_all(&self) -> DatabaseResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY created, id",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;
        users_from_rows(&rows)
    }

    async fn update(&self, id: Uuid, user: User) -> DatabaseResult<User> {
        check_hash(&user)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET id = ?, username = ?, password_hash = ?, email = ?, role = ?,
                modified = ?, last_login = ?, last_logout = ?
            WHERE id = ?
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.role.value())
        .bind(micros(now()))
        .bind(user.last_login.map(micros))
        .bind(user.last_logout.map(micros))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        self.get(user.id).await
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<User> {
        let row = sqlx::query(&format!(
            "DELETE FROM users WHERE id = ? RETURNING {}",
            COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?
        .ok_or(DatabaseError::NotFound)?;

        info!("Deleted user {}", id);
        user_from_row(&row)
    }

    async fn find(&self, filter: &UserFilter) -> DatabaseResult<Vec<User>> {
        let limits = filter.index_limits();
        if limits.is_impossible() {
            return Ok(Vec::new());
        }

        let mut sql = format!("SELECT {} FROM users WHERE 1 = 1", COLUMNS);
        if limits.min.is_some() {
            sql.push_str(" AND created >= ?");
        }
        if limits.max.is_some() {
            sql.push_str(" AND created <= ?");
        }
        sql.push_str(" ORDER BY created, id");

        let mut query = sqlx::query(&sql);
        if let Some(min) = limits.min {
            query = query.bind(micros(min));
        }
        if let Some(max) = limits.max {
            query = query.bind(micros(max));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(users_from_rows(&rows)?
            .into_iter()
            .filter(|u| filter.matches(u))
            .collect())
    }

    async fn close(&self) -> DatabaseResult<()> {
        if self.pool.is_closed() {
            return Err(DatabaseError::Connection(sqlx::Error::PoolClosed));
        }
        self.pool.close().await;
        Ok(())
    }
}
