//! Echo component: returns the posted message, and who sent it when the
//! request carried a valid token.

use axum::{Json, Router, middleware, routing::post};
use auth::middleware::{MaybeUser, optional_auth};
use common::ApiConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::Component;
use crate::error::{ApiError, ApiResult};
use crate::state::Environment;

#[derive(Debug, Deserialize)]
pub struct EchoRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
}

pub struct Echo;

impl Component for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn routes(&self, _api: &ApiConfig, env: &Environment) -> ApiResult<Router> {
        Ok(Router::new()
            .route("/", post(echo))
            .route_layer(middleware::from_fn_with_state(
                env.auth.clone(),
                optional_auth,
            )))
    }
}

async fn echo(
    MaybeUser(user): MaybeUser,
    Json(request): Json<EchoRequest>,
) -> ApiResult<Json<EchoResponse>> {
    if request.message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    debug!("Echoing {} bytes", request.message.len());
    Ok(Json(EchoResponse {
        message: request.message,
        requester: user.map(|u| u.username),
    }))
}
