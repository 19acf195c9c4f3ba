//! Bearer token codec
//!
//! Tokens are HS256 JWTs. The HMAC key is the server secret followed by the
//! subject's password hash and last logout time, so logging out or changing
//! the password invalidates every token issued before. Because the key
//! depends on the user, validation reads the subject from the unverified
//! claims, loads the user from the store and only then checks the signature.
//! The claims themselves are never trusted: callers get the live record.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{Role, User};
use crate::repositories::CredentialStore;

pub const ISSUER: &str = "jelly";

pub const MIN_SECRET_LEN: usize = 32;
pub const MAX_SECRET_LEN: usize = 64;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    pub token_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl JwtConfig {
    /// Secret must be between 32 and 64 bytes
    pub fn new(secret: impl Into<Vec<u8>>, token_ttl: Duration) -> AuthResult<Self> {
        let secret = secret.into();
        if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&secret.len()) {
            return Err(AuthError::BadArgument(format!(
                "token secret must be {} to {} bytes long, got {}",
                MIN_SECRET_LEN,
                MAX_SECRET_LEN,
                secret.len()
            )));
        }
        Ok(Self { secret, token_ttl })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

fn signing_key(secret: &[u8], user: &User) -> Vec<u8> {
    let logout = user.last_logout.map_or(0, |t| t.timestamp_micros());
    let mut key = Vec::with_capacity(secret.len() + user.password_hash.len() + 20);
    key.extend_from_slice(secret);
    key.extend_from_slice(user.password_hash.as_bytes());
    key.extend_from_slice(logout.to_string().as_bytes());
    key
}

fn sign(secret: &[u8], user: &User, claims: &Claims) -> AuthResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(&signing_key(secret, user)),
    )
    .map_err(|e| AuthError::Internal(format!("failed to sign token: {}", e)))
}

/// Issue a token for `user` valid for `ttl`
pub fn generate(secret: &[u8], user: &User, ttl: Duration) -> AuthResult<String> {
    let now = Utc::now().timestamp();
    let ttl = i64::try_from(ttl.as_secs())
        .map_err(|_| AuthError::BadArgument("token lifetime is too long".to_string()))?;
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        iss: ISSUER.to_string(),
        iat: now,
        exp: now.saturating_add(ttl),
    };
    sign(secret, user, &claims)
}

fn unverified_claims(token: &str) -> AuthResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Verify `token` and resolve its subject from the store
pub async fn validate(
    token: &str,
    secret: &[u8],
    store: &dyn CredentialStore,
) -> AuthResult<User> {
    let hint = unverified_claims(token)?;
    let user = store.get(hint.sub).await.map_err(|e| {
        debug!("Token subject {} could not be loaded: {}", hint.sub, e);
        AuthError::InvalidToken("unknown subject".to_string())
    })?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(&signing_key(secret, &user)),
        &validation,
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(user)
}

/// Issues bearer tokens and resolves them back to live users
#[async_trait]
pub trait TokenCodec: Send + Sync {
    fn generate(&self, user: &User) -> AuthResult<String>;

    async fn validate(&self, token: &str, store: &dyn CredentialStore) -> AuthResult<User>;
}

/// JWT codec bound to one configuration
#[derive(Debug, Clone)]
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn token_ttl(&self) -> Duration {
        self.config.token_ttl
    }
}

#[async_trait]
impl TokenCodec for JwtService {
    fn generate(&self, user: &User) -> AuthResult<String> {
        generate(self.config.secret(), user, self.config.token_ttl)
    }

    async fn validate(&self, token: &str, store: &dyn CredentialStore) -> AuthResult<User> {
        validate(token, self.config.secret(), store).await
    }
}
