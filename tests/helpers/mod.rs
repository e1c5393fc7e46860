#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use crm::config::Config;
use crm::store::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "testpass123";

pub fn test_config() -> Config {
    Config {
        listen: "127.0.0.1:0".into(),
        database_url: "postgres://localhost/test".into(),
        db_max_open_conns: 5,
        db_max_idle_conns: 1,
        db_conn_max_lifetime: Duration::from_secs(300),
        jwt_secret: TEST_SECRET.into(),
        jwt_expiry: Duration::from_secs(3600),
        cors_origins: vec![],
        trust_proxy_headers: false,
    }
}

/// Build a test `AppState` from the given pool.
pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
    }
}

/// Build the full application router with the given state.
pub fn test_router(state: AppState) -> Router {
    crm::app(state)
}

/// Tenant created through registration, seen from its admin.
pub struct Registered {
    pub token: String,
    pub user_id: i64,
    pub tenant_id: i64,
    pub body: Value,
}

/// Register `email` as admin of a new tenant called `tenant_name`.
pub async fn register(app: &Router, email: &str, tenant_name: &str) -> Registered {
    let (status, body) = post_json(
        app,
        "",
        "/api/auth/register",
        serde_json::json!({
            "email": email,
            "password": PASSWORD,
            "full_name": "Test Admin",
            "tenant_name": tenant_name,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    Registered {
        token: body["token"].as_str().unwrap().to_owned(),
        user_id: body["user"]["id"].as_i64().unwrap(),
        tenant_id: body["tenant"]["id"].as_i64().unwrap(),
        body,
    }
}

/// Log in, optionally choosing the tenant. Returns `(status, body)`.
pub async fn login(
    app: &Router,
    email: &str,
    password: &str,
    tenant_id: Option<i64>,
) -> (StatusCode, Value) {
    post_json(
        app,
        "",
        "/api/auth/login",
        serde_json::json!({
            "email": email,
            "password": password,
            "tenant_id": tenant_id,
        }),
    )
    .await
}

/// Add a brand-new user to the admin's tenant with `role`, log them in to
/// that tenant and return `(user_id, token)`.
pub async fn add_member(
    app: &Router,
    admin: &Registered,
    email: &str,
    role: &str,
) -> (i64, String) {
    let (status, body) = post_json(
        app,
        &admin.token,
        "/api/tenant/users",
        serde_json::json!({
            "email": email,
            "password": PASSWORD,
            "full_name": "Team Member",
            "role": role,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add user failed: {body}");
    let user_id = body["user"]["id"].as_i64().unwrap();

    let (status, body) = login(app, email, PASSWORD, Some(admin.tenant_id)).await;
    assert_eq!(status, StatusCode::OK, "member login failed: {body}");
    (user_id, body["token"].as_str().unwrap().to_owned())
}

/// Create a contact. Returns its id.
pub async fn create_contact(app: &Router, token: &str, first_name: &str, last_name: &str) -> i64 {
    let (status, body) = post_json(
        app,
        token,
        "/api/contacts",
        serde_json::json!({ "first_name": first_name, "last_name": last_name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create contact failed: {body}");
    body["contact"]["id"].as_i64().unwrap()
}

/// Id of the stage called `name`, seeding the defaults if needed.
pub async fn stage_id(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = get_json(app, token, "/api/pipeline/stages").await;
    assert_eq!(status, StatusCode::OK, "list stages failed: {body}");
    body["stages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == name)
        .unwrap_or_else(|| panic!("stage {name} not found"))["id"]
        .as_i64()
        .unwrap()
}

/// Create a deal in `stage_id`. Returns the `deal` object of the response.
pub async fn create_deal(
    app: &Router,
    token: &str,
    title: &str,
    stage_id: i64,
    value: f64,
) -> Value {
    let (status, body) = post_json(
        app,
        token,
        "/api/deals",
        serde_json::json!({ "title": title, "stage_id": stage_id, "value": value }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create deal failed: {body}");
    body["deal"].clone()
}

/// Send a GET request with Bearer auth.
pub async fn get_json(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    send(app, "GET", token, path, None).await
}

/// Send a POST request with Bearer auth and JSON body.
pub async fn post_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", token, path, Some(body)).await
}

/// Send a PATCH request with Bearer auth and JSON body.
pub async fn patch_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PATCH", token, path, Some(body)).await
}

/// Send a PUT request with Bearer auth and JSON body.
pub async fn put_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", token, path, Some(body)).await
}

/// Send a DELETE request with Bearer auth.
pub async fn delete_json(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    send(app, "DELETE", token, path, None).await
}

async fn send(
    app: &Router,
    method: &str,
    token: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if !token.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = body_json(resp).await;
    (status, body)
}

/// Extract JSON body from a response.
async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
