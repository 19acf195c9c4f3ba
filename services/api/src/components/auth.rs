//! User accounts, login and tokens

use axum::Router;
use common::ApiConfig;

use crate::component::Component;
use crate::error::ApiResult;
use crate::state::{AUTH_API, Environment};

pub struct AuthComponent;

impl Component for AuthComponent {
    fn name(&self) -> &'static str {
        AUTH_API
    }

    // Store and secret are set up once in `Environment::build`
    fn routes(&self, _api: &ApiConfig, env: &Environment) -> ApiResult<Router> {
        Ok(auth::routes::create_router(env.auth.clone()))
    }
}
