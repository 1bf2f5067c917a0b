//! Shared helpers for the HTTP integration tests.
//!
//! Every test gets its own in-memory SQLite database with all migrations applied.

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use projectdock_api::auth::{jwt, password};
use projectdock_api::config::{Config, Environment};
use projectdock_api::entities::status::Role;
use projectdock_api::entities::user;
use projectdock_api::state::AppState;

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only-32chars";
pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        server_host: std::net::IpAddr::from([127, 0, 0, 1]),
        server_port: 0,
        environment: Environment::Development,
        log_level: "warn".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration_secs: 3600,
        api_token_expires_days: 30,
        frontend_url: "http://localhost:3000".to_string(),
    }
}

pub async fn test_app() -> TestApp {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let state = AppState {
        db: db.clone(),
        config: test_config(),
    };
    TestApp {
        router: projectdock_api::routes::app(state),
        db,
    }
}

/// Send a request and return (status, parsed JSON body). Empty bodies parse to `Null`.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn patch_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, token, None).await
}

/// Register a customer through the API and return (`jwt`, `user_id`).
pub async fn register_customer(app: &Router, email: &str) -> (String, String) {
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        None,
        &json!({ "name": "Test Customer", "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    let id = body["data"]["user"]["id"].as_str().unwrap_or_default().to_string();
    (token, id)
}

/// Insert an admin directly (there is no admin sign-up) and return a JWT for it.
pub async fn create_admin(db: &DatabaseConnection) -> String {
    let now = Utc::now().fixed_offset();
    let admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Admin".to_string()),
        email: Set(format!("admin-{}@example.com", Uuid::new_v4().simple())),
        password_hash: Set(password::hash_password(PASSWORD).expect("hash password")),
        role: Set(Role::Admin.as_str().to_string()),
        phone: Set(None),
        company: Set(None),
        address: Set(None),
        api_token_hash: Set(None),
        token_expiry: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert admin");

    jwt::issue_token(admin.id, &admin.email, &admin.role, JWT_SECRET, 3600).expect("issue jwt")
}

/// Create a package through the admin API and return its JSON (`plans` included).
pub async fn create_package(
    app: &Router,
    admin: &str,
    max_projects: i32,
    max_tables: i32,
    plans: Value,
) -> Value {
    let (status, body) = post_json(
        app,
        "/api/admin/package",
        Some(admin),
        &json!({
            "name": format!("Package {}", &Uuid::new_v4().simple().to_string()[..6]),
            "description": "Test package",
            "max_projects": max_projects,
            "max_tables_per_project": max_tables,
            "plans": plans,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create package failed: {body}");
    body["data"].clone()
}

/// A package with one 30-day monthly plan priced 100. Returns (`package_id`, `plan_id`).
pub async fn monthly_package(
    app: &Router,
    admin: &str,
    max_projects: i32,
    max_tables: i32,
) -> (String, String) {
    let package = create_package(
        app,
        admin,
        max_projects,
        max_tables,
        json!([{ "plan_type": "monthly", "duration_days": 30, "price": 100 }]),
    )
    .await;
    let package_id = package["id"].as_str().unwrap_or_default().to_string();
    let plan_id = package["plans"][0]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    (package_id, plan_id)
}

/// Buy a plan as a customer and return the purchase JSON.
pub async fn buy(app: &Router, customer: &str, plan_id: &str) -> Value {
    let (status, body) = post_json(
        app,
        "/api/customer/package/buy",
        Some(customer),
        &json!({ "package_plan_id": plan_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "purchase failed: {body}");
    body["data"]["purchase"].clone()
}

/// Create a project and return its JSON.
pub async fn create_project(app: &Router, customer: &str, plan_id: &str, name: &str) -> Value {
    let (status, body) = post_json(
        app,
        "/api/customer/projects",
        Some(customer),
        &json!({ "package_plan_id": plan_id, "name": name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "project failed: {body}");
    body["data"].clone()
}

/// Body for a minimal table creation request.
pub fn table_body(project_id: &str, name: &str) -> Value {
    json!({
        "project_id": project_id,
        "table_name": name,
        "schema_json": { "columns": [{ "name": "id", "type": "uuid" }] },
    })
}
