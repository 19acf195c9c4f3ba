//! Configuration section of the auth component

use std::time::Duration;

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};
use crate::jwt::{DEFAULT_TOKEN_TTL, JwtConfig};

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL.as_secs()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Token signing secret; one is generated at startup when absent
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// `username:password` of an admin to create or promote at startup
    #[serde(default)]
    pub set_admin: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: None,
            token_ttl_secs: default_token_ttl_secs(),
            set_admin: None,
        }
    }
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Build the token configuration around `secret`
    pub fn jwt_config(&self, secret: impl Into<Vec<u8>>) -> AuthResult<JwtConfig> {
        if self.token_ttl_secs == 0 {
            return Err(AuthError::BadArgument(
                "token_ttl_secs must be positive".to_string(),
            ));
        }
        JwtConfig::new(secret, self.token_ttl())
    }

    /// Split `set_admin` into username and password
    pub fn admin_credentials(&self) -> AuthResult<Option<(String, String)>> {
        let Some(value) = &self.set_admin else {
            return Ok(None);
        };
        match value.split_once(':') {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
                Ok(Some((user.to_string(), pass.to_string())))
            }
            _ => Err(AuthError::BadArgument(
                "set_admin must look like 'username:password'".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: AuthSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.token_ttl(), Duration::from_secs(3600));
        assert!(settings.secret.is_none());
        assert_eq!(settings.admin_credentials().unwrap(), None);
    }

    #[test]
    fn test_admin_credentials() {
        let mut settings = AuthSettings {
            set_admin: Some("root:s3:cret".to_string()),
            ..AuthSettings::default()
        };
        assert_eq!(
            settings.admin_credentials().unwrap(),
            Some(("root".to_string(), "s3:cret".to_string()))
        );

        for bad in ["root", ":pw", "root:"] {
            settings.set_admin = Some(bad.to_string());
            assert!(settings.admin_credentials().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_jwt_config_checks_secret_and_ttl() {
        let settings = AuthSettings::default();
        assert!(settings.jwt_config("short").is_err());
        assert!(settings.jwt_config("x".repeat(40)).is_ok());

        let zero = AuthSettings {
            token_ttl_secs: 0,
            ..AuthSettings::default()
        };
        assert!(zero.jwt_config("x".repeat(40)).is_err());
    }
}
