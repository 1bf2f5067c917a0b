//! Health endpoints.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_root_liveness() {
    let app = common::test_app().await;

    let (status, body) = common::get(&app.router, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_health_reports_database() {
    let app = common::test_app().await;

    let (status, body) = common::get(&app.router, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["database"], "connected");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = common::test_app().await;

    let (status, _) = common::get(&app.router, "/api/does-not-exist", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
