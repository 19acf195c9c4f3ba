//! Error taxonomy of the auth module
//!
//! Every store and hashing failure is classified into one of these kinds
//! before it leaves the login service. Credential failures are deliberately
//! indistinguishable: an unknown username and a wrong password both surface
//! as `BadCredentials`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Caller input was invalid
    #[error("{0}")]
    BadArgument(String),

    #[error("incorrect username or password")]
    BadCredentials,

    #[error("the requested resource was not found")]
    NotFound,

    #[error("{0}")]
    AlreadyExists(String),

    /// Bearer token failed verification or its subject is gone
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// No credentials were presented
    #[error("authorization is required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    /// Unexpected persistence or hashing failure; carries the cause
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Token signing failed
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Wrap any failure as a `Store` error without classifying it
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AuthError::Store(Box::new(err))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::BadArgument(_) => StatusCode::BAD_REQUEST,
            AuthError::BadCredentials | AuthError::InvalidToken(_) | AuthError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyExists(_) => StatusCode::CONFLICT,
            AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound => AuthError::NotFound,
            DatabaseError::Constraint(msg) => AuthError::AlreadyExists(msg),
            other => AuthError::store(other),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::Store(cause) => {
                error!("Store failure: {}", cause);
                "An internal server error occurred".to_string()
            }
            AuthError::Internal(msg) => {
                error!("Internal failure: {}", msg);
                "An internal server error occurred".to_string()
            }
            // never tell the client why a token was rejected
            AuthError::InvalidToken(_) => "Authorization is required".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for auth results
pub type AuthResult<T> = Result<T, AuthError>;
