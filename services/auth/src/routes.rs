//! Authentication routes
//!
//! Everything except `/login` and `/info` needs a bearer token. Users may
//! act on their own record; anything touching other users, and listing or
//! creating users, needs the admin role.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use owdb::Criterion;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::middleware::{AuthUser, require_auth};
use crate::models::{
    LoginCredentials, NewUser, Role, UpdatePassword, UpdateUser, User, UserResponse,
};
use crate::query::{UserFilter, UserWhere};
use crate::state::AuthState;
use crate::validation::parse_id;

/// Response for token generation
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Query parameters of `GET /users`; all optional, all must hold
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl UserQuery {
    /// `None` when no parameter was given
    pub fn filter(&self) -> Option<UserFilter> {
        let mut conditions: Vec<UserFilter> = Vec::new();
        if let Some(username) = &self.username {
            conditions.push(UserWhere::username(Criterion::Eq(username.clone())).into());
        }
        if let Some(role) = self.role {
            conditions.push(UserWhere::role(Criterion::Eq(role)).into());
        }
        if let Some(after) = self.created_after {
            conditions.push(UserWhere::created(Criterion::Gt(after)).into());
        }
        if let Some(before) = self.created_before {
            conditions.push(UserWhere::created(Criterion::Lt(before)).into());
        }

        let mut conditions = conditions.into_iter();
        let first = conditions.next()?;
        let rest: Vec<UserFilter> = conditions.collect();
        if rest.is_empty() {
            Some(first)
        } else {
            Some(first.and_all(rest))
        }
    }
}

/// Create the router for the authentication component
pub fn create_router(state: AuthState) -> Router {
    let protected = Router::new()
        .route("/login/:id", delete(logout))
        .route("/tokens", post(refresh_token))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/password", put(update_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/login", post(login))
        .route("/info", get(info))
        .merge(protected)
        .with_state(state)
}

fn require_admin(caller: &User) -> AuthResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden("admin role required".to_string()))
    }
}

fn require_self_or_admin(caller: &User, target: Uuid) -> AuthResult<()> {
    if caller.id == target || caller.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "not allowed to act on another user".to_string(),
        ))
    }
}

fn issue(state: &AuthState, user: &User) -> AuthResult<(StatusCode, Json<TokenResponse>)> {
    let token = state.tokens.generate(user)?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            user_id: user.id,
            token,
        }),
    ))
}

/// User login endpoint
async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginCredentials>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .service
        .login(&payload.username, &payload.password)
        .await?;
    issue(&state, &user)
}

async fn logout(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> AuthResult<StatusCode> {
    let target = parse_id(&id)?;
    require_self_or_admin(&caller, target)?;
    state.service.logout(target).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fresh token for the caller
async fn refresh_token(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
) -> AuthResult<impl IntoResponse> {
    issue(&state, &caller)
}

async fn list_users(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<UserQuery>,
) -> AuthResult<Json<Vec<UserResponse>>> {
    require_admin(&caller)?;
    let users = match query.filter() {
        Some(filter) => state.service.find_users(&filter).await?,
        None => state.service.get_all_users().await?,
    };
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

async fn create_user(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<NewUser>,
) -> AuthResult<impl IntoResponse> {
    require_admin(&caller)?;
    let user = state
        .service
        .create_user(
            &payload.username,
            &payload.password,
            payload.email.as_deref().unwrap_or_default(),
            payload.role.unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn get_user(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> AuthResult<Json<UserResponse>> {
    require_self_or_admin(&caller, parse_id(&id)?)?;
    let user = state.service.get_user(&id).await?;
    Ok(Json(user.into()))
}

async fn update_user(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUser>,
) -> AuthResult<Json<UserResponse>> {
    let target = parse_id(&id)?;
    require_self_or_admin(&caller, target)?;

    let current = state.service.get_user(&id).await?;
    let new_id = payload.id.unwrap_or_else(|| id.clone());
    let role = payload.role.unwrap_or(current.role);
    if !caller.is_admin() {
        if parse_id(&new_id)? != target {
            return Err(AuthError::Forbidden(
                "only an admin may change a user ID".to_string(),
            ));
        }
        if role != current.role {
            return Err(AuthError::Forbidden(
                "only an admin may change a role".to_string(),
            ));
        }
    }
    let email = payload
        .email
        .or(current.email)
        .unwrap_or_default();

    let user = state
        .service
        .update_user(&id, &new_id, &payload.username, &email, role)
        .await?;
    Ok(Json(user.into()))
}

async fn update_password(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePassword>,
) -> AuthResult<Json<UserResponse>> {
    require_self_or_admin(&caller, parse_id(&id)?)?;
    let user = state.service.update_password(&id, &payload.password).await?;
    Ok(Json(user.into()))
}

async fn delete_user(
    State(state): State<AuthState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> AuthResult<Json<UserResponse>> {
    require_self_or_admin(&caller, parse_id(&id)?)?;
    let user = state.service.delete_user(&id).await?;
    Ok(Json(user.into()))
}

async fn info() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
