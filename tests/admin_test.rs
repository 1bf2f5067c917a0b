//! Admin views over customers and their projects.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_admin_lists_customers_only() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (_, maria_id) = common::register_customer(&app.router, "maria@example.com").await;
    common::register_customer(&app.router, "nils@example.com").await;

    let (status, body) = common::get(&app.router, "/api/admin/users", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
    assert!(
        body["data"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .all(|u| u["role"] == "user" && u.get("password_hash").is_none())
    );

    let (_, body) = common::get(&app.router, "/api/admin/users?search=maria", Some(&admin)).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], maria_id.as_str());

    let (status, body) = common::get(
        &app.router,
        &format!("/api/admin/users/{maria_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "maria@example.com");
    assert_eq!(body["data"]["total_purchases"], 0);
}

#[tokio::test]
async fn test_admin_limit_is_clamped() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    common::register_customer(&app.router, "clamp@example.com").await;

    let (_, body) = common::get(&app.router, "/api/admin/users?limit=500&page=0", Some(&admin)).await;
    assert_eq!(body["pagination"]["limit"], 100);
    assert_eq!(body["pagination"]["page"], 1);

    let (status, body) = common::get(
        &app.router,
        "/api/admin/users?page=18446744073709551615&limit=100",
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 1_000_000);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_admin_project_management() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, customer_id) = common::register_customer(&app.router, "owner@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 2, 2).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let project = common::create_project(&app.router, &customer, &plan_id, "Managed").await;
    let project_id = project["id"].as_str().unwrap_or_default();
    common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "things"),
    )
    .await;

    let (status, body) = common::get(&app.router, "/api/admin/projects", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["owner_email"], "owner@example.com");

    let (_, body) = common::get(
        &app.router,
        &format!("/api/admin/projects/user/{customer_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(body["pagination"]["total"], 1);

    let (status, body) = common::get(
        &app.router,
        &format!("/api/admin/projects/{project_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tables"].as_array().map(Vec::len), Some(1));

    let (status, body) = common::patch_json(
        &app.router,
        &format!("/api/admin/projects/{project_id}/status"),
        Some(&admin),
        &json!({ "status": "inactive" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "inactive");

    let (status, _) = common::delete(
        &app.router,
        &format!("/api/admin/projects/{project_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::get(
        &app.router,
        &format!("/api/admin/projects/{project_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");

    let (_, body) = common::get(&app.router, "/api/customer/project-table", Some(&customer)).await;
    assert_eq!(body["pagination"]["total"], 0);
}
