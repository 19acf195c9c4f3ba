//! Greeting component, polite or not

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::get,
};
use auth::middleware::{AuthUser, require_auth};
use common::{ApiConfig, ConfigError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::error::ApiResult;
use crate::state::Environment;

const NAME: &str = "hello";

fn default_rudeness() -> f64 {
    0.5
}

fn default_nice() -> String {
    "Hello, nice to meet you!".to_string()
}

fn default_rude() -> String {
    "What do you want?".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelloSettings {
    /// Probability that `/random` answers rudely
    #[serde(default = "default_rudeness")]
    pub rudeness: f64,
    #[serde(default = "default_nice")]
    pub nice: String,
    #[serde(default = "default_rude")]
    pub rude: String,
}

impl HelloSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.rudeness) {
            return Err(ConfigError::Invalid(format!(
                "apis.{}.rudeness must be between 0 and 1, got {}",
                NAME, self.rudeness
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

pub struct Hello;

impl Component for Hello {
    fn name(&self) -> &'static str {
        NAME
    }

    fn routes(&self, api: &ApiConfig, env: &Environment) -> ApiResult<Router> {
        let settings: HelloSettings = api.section(NAME)?;
        settings.validate()?;

        let protected = Router::new()
            .route("/secret", get(secret))
            .route_layer(middleware::from_fn_with_state(
                env.auth.clone(),
                require_auth,
            ));

        Ok(Router::new()
            .route("/nice", get(nice))
            .route("/rude", get(rude))
            .route("/random", get(random))
            .with_state(settings)
            .merge(protected))
    }
}

async fn nice(State(settings): State<HelloSettings>) -> Json<Greeting> {
    Json(Greeting {
        message: settings.nice,
    })
}

async fn rude(State(settings): State<HelloSettings>) -> Json<Greeting> {
    Json(Greeting {
        message: settings.rude,
    })
}

async fn random(State(settings): State<HelloSettings>) -> Json<Greeting> {
    let rude = rand::thread_rng().gen_bool(settings.rudeness);
    let message = if rude { settings.rude } else { settings.nice };
    Json(Greeting { message })
}

async fn secret(AuthUser(user): AuthUser) -> Json<Greeting> {
    Json(Greeting {
        message: format!("The secret is safe with you, {}.", user.username),
    })
}
