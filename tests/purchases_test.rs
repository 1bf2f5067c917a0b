//! Buying plans, purchase history and admin purchase management.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use axum::http::StatusCode;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use projectdock_api::entities::{package, payment, purchase};

#[tokio::test]
async fn test_purchase_seeds_quota_and_records_payment() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "buyer@example.com").await;
    let package = common::create_package(
        &app.router,
        &admin,
        5,
        10,
        json!([{ "plan_type": "monthly", "duration_days": 30, "price": 100,
                 "discount_type": "percentage", "discount_value": 10 }]),
    )
    .await;
    let plan_id = package["plans"][0]["id"].as_str().unwrap_or_default();

    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/package/buy",
        Some(&customer),
        &json!({ "package_plan_id": plan_id }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Package purchased successfully");
    let bought = &body["data"]["purchase"];
    assert_eq!(bought["total_project_limit"], 5);
    assert_eq!(bought["total_created_project"], 0);
    assert_eq!(bought["status"], "active");
    assert_eq!(bought["amount_paid"].as_f64(), Some(90.0));
    assert_eq!(body["data"]["plan_type"], "monthly");

    let package_id = Uuid::parse_str(package["id"].as_str().unwrap()).unwrap();
    let stored = package::Entity::find_by_id(package_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sell_count, 1);

    let purchase_id = Uuid::parse_str(bought["id"].as_str().unwrap()).unwrap();
    let payments = payment::Entity::find()
        .filter(payment::Column::PurchaseId.eq(purchase_id))
        .filter(payment::Column::Status.eq("completed"))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(payments, 1);
}

#[tokio::test]
async fn test_purchase_of_unknown_or_inactive_plan_fails() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "buyer@example.com").await;

    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/package/buy",
        Some(&customer),
        &json!({ "package_plan_id": Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Package plan not found");

    let (package_id, plan_id) = common::monthly_package(&app.router, &admin, 1, 1).await;
    common::patch_json(
        &app.router,
        &format!("/api/admin/package/plan/{plan_id}/status"),
        Some(&admin),
        &json!({ "status": "inactive" }),
    )
    .await;
    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/package/buy",
        Some(&customer),
        &json!({ "package_plan_id": plan_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This package plan is not available");

    // An active plan of an archived package is not for sale either.
    common::patch_json(
        &app.router,
        &format!("/api/admin/package/plan/{plan_id}/status"),
        Some(&admin),
        &json!({ "status": "active" }),
    )
    .await;
    common::patch_json(
        &app.router,
        &format!("/api/admin/package/{package_id}/status"),
        Some(&admin),
        &json!({ "status": "archived" }),
    )
    .await;
    let (status, _) = common::post_json(
        &app.router,
        "/api/customer/package/buy",
        Some(&customer),
        &json!({ "package_plan_id": plan_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let purchases = purchase::Entity::find().count(&app.db).await.unwrap();
    assert_eq!(purchases, 0);
}

#[tokio::test]
async fn test_purchase_history() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "history@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 2, 2).await;
    common::buy(&app.router, &customer, &plan_id).await;

    let (status, body) =
        common::get(&app.router, "/api/customer/package/purchased", Some(&customer)).await;

    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "active");
    assert_eq!(history[0]["remaining_days"], 30);
    assert_eq!(history[0]["plan_type"], "monthly");
    assert_eq!(history[0]["duration_days"], 30);
    assert!(history[0]["package_name"].is_string());
}

#[tokio::test]
async fn test_admin_purchase_management() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (alice, alice_id) = common::register_customer(&app.router, "alice@example.com").await;
    let (bob, _) = common::register_customer(&app.router, "bob@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 1).await;
    let bought = common::buy(&app.router, &alice, &plan_id).await;
    common::buy(&app.router, &bob, &plan_id).await;
    let purchase_id = bought["id"].as_str().unwrap_or_default();

    let (status, body) = common::get(&app.router, "/api/admin/purchases", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = common::get(
        &app.router,
        &format!("/api/admin/purchases/user/{alice_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["user_email"], "alice@example.com");
    assert!(body["data"][0]["package_name"].is_string());

    let (status, body) = common::patch_json(
        &app.router,
        &format!("/api/admin/purchases/{purchase_id}/status"),
        Some(&admin),
        &json!({ "status": "cancelled" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (_, body) =
        common::get(&app.router, "/api/admin/purchases?status=cancelled", Some(&admin)).await;
    assert_eq!(body["pagination"]["total"], 1);

    // A cancelled purchase no longer grants projects.
    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/projects",
        Some(&alice),
        &json!({ "package_plan_id": plan_id, "name": "Blocked" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "No active package found. Please purchase a package first."
    );

    let (status, _) = common::patch_json(
        &app.router,
        &format!("/api/admin/purchases/{purchase_id}/status"),
        Some(&admin),
        &json!({ "status": "refunded" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::delete(
        &app.router,
        &format!("/api/admin/purchases/{purchase_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::get(
        &app.router,
        &format!("/api/admin/purchases/{purchase_id}"),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Purchase not found");
}
