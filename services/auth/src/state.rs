//! Shared state of the auth HTTP layer

use std::sync::Arc;

use crate::error::AuthResult;
use crate::jwt::TokenCodec;
use crate::models::User;
use crate::service::LoginService;

#[derive(Clone)]
pub struct AuthState {
    pub service: LoginService,
    pub tokens: Arc<dyn TokenCodec>,
}

impl AuthState {
    pub fn new<T: TokenCodec + 'static>(service: LoginService, tokens: T) -> Self {
        Self {
            service,
            tokens: Arc::new(tokens),
        }
    }

    /// Resolve a bearer token to the live user record
    pub async fn authenticate(&self, token: &str) -> AuthResult<User> {
        self.tokens.validate(token, self.service.store()).await
    }
}
