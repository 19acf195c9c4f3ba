//! Server router assembly

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use auth::middleware::unauth_delay;
use common::config::normalize_base;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::component::ComponentRegistry;
use crate::error::ApiResult;
use crate::state::Environment;

/// Mount every enabled API under `server.base` plus its own base
pub fn create_router(env: &Environment, registry: &ComponentRegistry) -> ApiResult<Router> {
    let mut names: Vec<&String> = env.config.apis.keys().collect();
    names.sort();

    let mut apis = Router::new();
    for name in names {
        let api = &env.config.apis[name];
        if !api.enabled {
            info!("API '{}' is disabled", name);
            continue;
        }

        let routes = registry.get(name)?.routes(api, env)?;
        let base = api.base_for(name);
        info!("Mounting API '{}' at {}", name, base);
        apis = if base == "/" {
            apis.merge(routes)
        } else {
            apis.nest(&base, routes)
        };
    }

    let server_base = normalize_base(&env.config.server.base);
    let app = Router::new().route("/health", get(health_check));
    let app = if server_base == "/" {
        app.merge(apis)
    } else {
        app.nest(&server_base, apis)
    };

    Ok(app
        .layer(middleware::from_fn_with_state(
            env.unauth_delay(),
            unauth_delay,
        ))
        .layer(TraceLayer::new_for_http()))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "jelly",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
