//! End-to-end HTTP flows through the assembled router

use std::sync::Arc;
use std::time::{Duration, Instant};

use api::{ApiError, ComponentRegistry, Environment, create_router};
use auth::repositories::InMemoryUserRepository;
use auth::{AuthState, JwtConfig, JwtService, LoginService, PasswordHashing, Role, SharedStore};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{ApiConfig, Config};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

async fn auth_state() -> AuthState {
    let store: SharedStore = Arc::new(InMemoryUserRepository::new());
    let service = LoginService::with_hasher(store, PasswordHashing::with_cost(8, 1).unwrap());
    service
        .create_user("admin", "adminpw", "", Role::Admin)
        .await
        .unwrap();
    service
        .create_user("alice", "pw123", "alice@example.com", Role::Normal)
        .await
        .unwrap();
    let tokens = JwtService::new(JwtConfig::new(SECRET, Duration::from_secs(60)).unwrap());
    AuthState::new(service, tokens)
}

fn config(server_base: &str, unauth_delay_ms: u64) -> Config {
    let mut config = Config::default();
    config.server.base = server_base.to_string();
    config.server.unauth_delay_ms = unauth_delay_ms;
    config.apis.insert("auth".to_string(), ApiConfig::default());
    config.apis.insert("echo".to_string(), ApiConfig::default());

    let mut hello = ApiConfig::default();
    hello.extra.insert("rudeness".to_string(), json!(0.0));
    config.apis.insert("hello".to_string(), hello);
    config
}

async fn app_with(config: Config) -> Router {
    let env = Environment::new(config, auth_state().await);
    create_router(&env, &ComponentRegistry::with_defaults()).unwrap()
}

async fn app() -> Router {
    app_with(config("/", 0)).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["user_id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_and_info() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/auth/info", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn login_then_read_own_record() {
    let app = app().await;
    let (id, token) = login(&app, "alice", "pw123").await;

    let uri = format!("/auth/users/{}", id);
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());
    assert!(body["last_login"].is_string());
}

#[tokio::test]
async fn bad_logins_and_missing_tokens_are_401() {
    let app = app().await;
    for (username, password) in [("alice", "wrong"), ("nobody", "pw123")] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert!(body["error"].is_string());
    }

    let (status, _) = send(&app, Method::GET, "/auth/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/auth/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_users_needs_admin_and_accepts_filters() {
    let app = app().await;
    let (_, alice) = login(&app, "alice", "pw123").await;
    let (_, admin) = login(&app, "admin", "adminpw").await;

    let (status, _) = send(&app, Method::GET, "/auth/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/auth/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) =
        send(&app, Method::GET, "/auth/users?role=admin", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "admin");

    let (status, body) = send(
        &app,
        Method::GET,
        "/auth/users?created_after=2000-01-01T00:00:00Z&username=alice",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_creates_users_and_duplicates_conflict() {
    let app = app().await;
    let (_, admin) = login(&app, "admin", "adminpw").await;
    let new_user = json!({ "username": "bob", "password": "bobpw", "role": "unverified" });

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/users",
        Some(&admin),
        Some(new_user.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "unverified");

    let (status, _) = send(&app, Method::POST, "/auth/users", Some(&admin), Some(new_user)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/users",
        Some(&admin),
        Some(json!({ "username": "carol", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    login(&app, "bob", "bobpw").await;
}

#[tokio::test]
async fn only_admins_change_roles_and_other_users() {
    let app = app().await;
    let (alice_id, alice) = login(&app, "alice", "pw123").await;
    let (admin_id, admin) = login(&app, "admin", "adminpw").await;
    let alice_uri = format!("/auth/users/{}", alice_id);

    let (status, _) = send(
        &app,
        Method::PUT,
        &alice_uri,
        Some(&alice),
        Some(json!({ "username": "alice", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/auth/users/{}", admin_id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &alice_uri,
        Some(&admin),
        Some(json!({ "username": "alice2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice2");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "normal");

    login(&app, "alice2", "pw123").await;
}

#[tokio::test]
async fn password_change_and_logout_revoke_tokens() {
    let app = app().await;
    let (id, token) = login(&app, "alice", "pw123").await;
    let me = format!("/auth/users/{}", id);

    let (status, body) = send(&app, Method::POST, "/auth/tokens", Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], id.as_str());

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("{}/password", me),
        Some(&token),
        Some(json!({ "password": "newpw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &me, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = login(&app, "alice", "newpw").await;
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/auth/login/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &me, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_can_delete_themselves() {
    let app = app().await;
    let (id, token) = login(&app, "alice", "pw123").await;
    let me = format!("/auth/users/{}", id);

    let (status, body) = send(&app, Method::DELETE, &me, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (_, admin) = login(&app, "admin", "adminpw").await;
    let (status, _) = send(&app, Method::GET, &me, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/auth/users/not-an-id", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn echo_names_the_requester_when_known() {
    let app = app().await;
    let (_, token) = login(&app, "alice", "pw123").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/echo",
        None,
        Some(json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "hi" }));

    let (_, body) = send(
        &app,
        Method::POST,
        "/echo",
        Some(&token),
        Some(json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(body["requester"], "alice");

    let (_, body) = send(
        &app,
        Method::POST,
        "/echo",
        Some("garbage"),
        Some(json!({ "message": "hi" })),
    )
    .await;
    assert!(body.get("requester").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/echo",
        None,
        Some(json!({ "message": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn hello_greetings_and_secret() {
    let app = app().await;
    let (status, nice) = send(&app, Method::GET, "/hello/nice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, rude) = send(&app, Method::GET, "/hello/rude", None, None).await;
    assert_ne!(nice, rude);

    // rudeness is 0 in this configuration
    let (_, random) = send(&app, Method::GET, "/hello/random", None, None).await;
    assert_eq!(random, nice);

    let (status, _) = send(&app, Method::GET, "/hello/secret", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = login(&app, "alice", "pw123").await;
    let (status, body) = send(&app, Method::GET, "/hello/secret", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn server_base_prefixes_apis_but_not_health() {
    let app = app_with(config("/api/", 0)).await;

    let (status, _) = send(&app, Method::GET, "/api/hello/nice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/hello/nice", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_base_and_disabled_apis() {
    let mut config = config("/", 0);
    if let Some(hello) = config.apis.get_mut("hello") {
        hello.base = Some("greet".to_string());
    }
    if let Some(echo) = config.apis.get_mut("echo") {
        echo.enabled = false;
    }
    let app = app_with(config).await;

    let (status, _) = send(&app, Method::GET, "/greet/nice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::POST,
        "/echo",
        None,
        Some(json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_component_fails_startup() {
    let mut config = config("/", 0);
    config.apis.insert("mystery".to_string(), ApiConfig::default());
    let env = Environment::new(config, auth_state().await);

    let result = create_router(&env, &ComponentRegistry::with_defaults());
    assert!(matches!(result, Err(ApiError::UnknownComponent(name)) if name == "mystery"));
}

#[tokio::test]
async fn failures_are_delayed() {
    let app = app_with(config("/", 150)).await;

    let started = Instant::now();
    let (status, _) = send(&app, Method::GET, "/hello/secret", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(started.elapsed() >= Duration::from_millis(150));

    let started = Instant::now();
    let (status, _) = send(&app, Method::GET, "/hello/nice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() < Duration::from_millis(150));
}
