//! Bearer token authentication for axum routers

use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use crate::error::AuthError;
use crate::models::User;
use crate::state::AuthState;

/// Reject the request unless it carries a valid bearer token. The resolved
/// user is stored in the request extensions.
pub async fn require_auth(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;
    let user = state.authenticate(bearer.token()).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Like [`require_auth`] but lets anonymous and badly authenticated
/// requests through without a user.
pub async fn optional_auth(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        match state.authenticate(bearer.token()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!("Ignoring unusable bearer token: {}", e),
        }
    }
    next.run(req).await
}

/// Hold back 401, 403 and 500 responses for `delay` to slow down guessing
pub async fn unauth_delay(State(delay): State<Duration>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if matches!(
        response.status(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::INTERNAL_SERVER_ERROR
    ) && !delay.is_zero()
    {
        tokio::time::sleep(delay).await;
    }
    response
}

/// The user resolved by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::Unauthorized)
    }
}

/// The user resolved by [`optional_auth`], if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<User>().cloned()))
    }
}
