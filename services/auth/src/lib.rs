//! Username/password authentication with bearer tokens
//!
//! [`LoginService`] holds the account rules on top of a [`CredentialStore`],
//! [`jwt`] issues and checks tokens, and [`routes::create_router`] exposes
//! both over HTTP.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod query;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use jwt::{JwtConfig, JwtService, TokenCodec};
pub use models::{Role, User};
pub use password::PasswordHashing;
pub use query::{UserFilter, UserWhere};
pub use repositories::{CredentialStore, SharedStore};
pub use service::LoginService;
pub use settings::AuthSettings;
pub use state::AuthState;
