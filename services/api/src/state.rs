//! Everything components need at startup

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use auth::repositories::InMemoryUserRepository;
use auth::{AuthSettings, AuthState, JwtService, LoginService, SharedStore};
use common::{Config, ConnectorRegistry};
use rand::{Rng, distributions::Alphanumeric};
use tracing::{info, warn};

/// Name of the API section configuring authentication
pub const AUTH_API: &str = "auth";

const GENERATED_SECRET_LEN: usize = 48;

/// Shared environment handed to every component
#[derive(Clone)]
pub struct Environment {
    pub config: Arc<Config>,
    pub auth: AuthState,
}

impl Environment {
    pub fn new(config: Config, auth: AuthState) -> Self {
        Self {
            config: Arc::new(config),
            auth,
        }
    }

    /// Open the credential store and set up token handling from `config`
    pub async fn build(config: Config, connectors: &ConnectorRegistry<SharedStore>) -> Result<Self> {
        let api = config.api(AUTH_API).filter(|api| api.enabled);
        let settings: AuthSettings = match api {
            Some(api) => api.section(AUTH_API)?,
            None => AuthSettings::default(),
        };

        let store = match api.and_then(|api| api.uses.first()) {
            Some(db_name) => {
                let db = config
                    .dbs
                    .get(db_name)
                    .with_context(|| format!("database '{}' is not declared", db_name))?;
                info!("Opening credential store '{}' ({})", db_name, db.kind);
                connectors
                    .connect(db)
                    .await
                    .with_context(|| format!("failed to open database '{}'", db_name))?
            }
            None => {
                warn!("No database configured for auth; users live in memory only");
                Arc::new(InMemoryUserRepository::new()) as SharedStore
            }
        };

        let secret = match &settings.secret {
            Some(secret) => secret.clone().into_bytes(),
            None => {
                warn!("No auth secret configured; tokens will not survive a restart");
                random_secret()
            }
        };
        let tokens = JwtService::new(settings.jwt_config(secret)?);
        let service = LoginService::new(store);

        if let Some((username, password)) = settings.admin_credentials()? {
            service
                .ensure_admin(&username, &password)
                .await
                .context("failed to set up admin user")?;
            info!("Admin user '{}' is ready", username);
        }

        Ok(Self::new(config, AuthState::new(service, tokens)))
    }

    pub fn unauth_delay(&self) -> Duration {
        self.config.server.unauth_delay()
    }
}

fn random_secret() -> Vec<u8> {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .collect()
}
