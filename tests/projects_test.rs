//! Quota-bounded provisioning of projects and tables.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use axum::http::StatusCode;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

use projectdock_api::config::{Config, Environment};
use projectdock_api::entities::{project, project_table, purchase};
use projectdock_api::state::AppState;

async fn table_count(app: &common::TestApp, project_id: &str) -> u64 {
    project_table::Entity::find()
        .filter(project_table::Column::ProjectId.eq(Uuid::parse_str(project_id).unwrap()))
        .count(&app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_project_requires_an_active_purchase() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "nopkg@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 1).await;

    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/projects",
        Some(&customer),
        &json!({ "package_plan_id": plan_id, "name": "First" }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "No active package found. Please purchase a package first."
    );
}

#[tokio::test]
async fn test_project_quota_is_enforced() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "quota@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 2, 4).await;
    let bought = common::buy(&app.router, &customer, &plan_id).await;

    let first = common::create_project(&app.router, &customer, &plan_id, "One").await;
    assert_eq!(first["total_table_limit"], 4);
    assert_eq!(first["total_created_table"], 0);
    assert_eq!(first["status"], "active");
    assert_eq!(first["purchase_id"], bought["id"]);
    assert!(first["db_name"].as_str().unwrap_or_default().starts_with("proj_"));
    common::create_project(&app.router, &customer, &plan_id, "Two").await;

    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/projects",
        Some(&customer),
        &json!({ "package_plan_id": plan_id, "name": "Three" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Project limit reached for this package");

    let projects = project::Entity::find().count(&app.db).await.unwrap();
    assert_eq!(projects, 2);
    let purchase_id = Uuid::parse_str(bought["id"].as_str().unwrap()).unwrap();
    let stored = purchase::Entity::find_by_id(purchase_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_created_project, 2);
}

#[tokio::test]
async fn test_deleting_a_project_does_not_refund_quota() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "refund@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 2).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let created = common::create_project(&app.router, &customer, &plan_id, "Only").await;
    let project_id = created["id"].as_str().unwrap_or_default();
    common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "users"),
    )
    .await;

    let (status, _) = common::delete(
        &app.router,
        &format!("/api/customer/projects/{project_id}"),
        Some(&customer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table_count(&app, project_id).await, 0);

    let (status, _) = common::post_json(
        &app.router,
        "/api/customer/projects",
        Some(&customer),
        &json!({ "package_plan_id": plan_id, "name": "Again" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_earliest_ending_purchase_with_room_is_charged() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "twice@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 1).await;
    let older = common::buy(&app.router, &customer, &plan_id).await;
    let newer = common::buy(&app.router, &customer, &plan_id).await;

    let first = common::create_project(&app.router, &customer, &plan_id, "A").await;
    let second = common::create_project(&app.router, &customer, &plan_id, "B").await;

    assert_eq!(first["purchase_id"], older["id"]);
    assert_eq!(second["purchase_id"], newer["id"]);

    let (status, _) = common::post_json(
        &app.router,
        "/api/customer/projects",
        Some(&customer),
        &json!({ "package_plan_id": plan_id, "name": "C" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_table_quota_is_enforced() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "tables@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 2).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let created = common::create_project(&app.router, &customer, &plan_id, "Shop").await;
    let project_id = created["id"].as_str().unwrap_or_default();

    for name in ["orders", "customers"] {
        let (status, body) = common::post_json(
            &app.router,
            "/api/customer/project-table",
            Some(&customer),
            &common::table_body(project_id, name),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["data"]["table_name"], name);
    }

    let (_, body) = common::get(
        &app.router,
        &format!("/api/customer/projects/{project_id}"),
        Some(&customer),
    )
    .await;
    assert_eq!(body["data"]["total_created_table"], 2);
    assert_eq!(body["data"]["tables"].as_array().map(Vec::len), Some(2));

    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "invoices"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Table limit reached for this package");
    assert_eq!(table_count(&app, project_id).await, 2);
}

#[tokio::test]
async fn test_table_creation_rolls_back_when_counter_update_fails() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "rollback@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 5).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let created = common::create_project(&app.router, &customer, &plan_id, "Fragile").await;
    let project_id = created["id"].as_str().unwrap_or_default();

    app.db
        .execute_unprepared(
            "CREATE TRIGGER fail_table_counter BEFORE UPDATE OF total_created_table ON projects \
             BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
        )
        .await
        .unwrap();

    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "ghost"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to create project table");
    assert!(
        body["details"]
            .as_str()
            .is_some_and(|d| d.contains("simulated failure"))
    );
    assert_eq!(table_count(&app, project_id).await, 0);

    let production = projectdock_api::routes::app(AppState {
        db: app.db.clone(),
        config: Config {
            environment: Environment::Production,
            ..common::test_config()
        },
    });
    let (status, body) = common::post_json(
        &production,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "ghost"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to create project table");
    assert!(body.get("details").is_none());
    assert_eq!(table_count(&app, project_id).await, 0);
}

#[tokio::test]
async fn test_table_rules() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "rules@example.com").await;
    let (other, _) = common::register_customer(&app.router, "other@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 1, 5).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let created = common::create_project(&app.router, &customer, &plan_id, "Rules").await;
    let project_id = created["id"].as_str().unwrap_or_default();

    let (status, _) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &json!({ "project_id": project_id, "table_name": "1bad name", "schema_json": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &json!({ "project_id": project_id, "table_name": "scalar", "schema_json": 42 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Someone else's project looks like a missing one.
    let (status, body) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&other),
        &common::table_body(project_id, "stolen"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found or package plan is inactive");

    let (_, body) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "items"),
    )
    .await;
    let table_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = common::put_json(
        &app.router,
        &format!("/api/customer/project-table/{table_id}"),
        Some(&customer),
        &json!({ "table_name": "products" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["table_name"], "products");

    // Once the plan is switched off, reads and edits stop but deletes still work.
    common::patch_json(
        &app.router,
        &format!("/api/admin/package/plan/{plan_id}/status"),
        Some(&admin),
        &json!({ "status": "inactive" }),
    )
    .await;

    let (status, body) = common::get(
        &app.router,
        &format!("/api/customer/project-table/{table_id}"),
        Some(&customer),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        "Project table not found or package plan is inactive"
    );

    let (status, _) = common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "late"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::delete(
        &app.router,
        &format!("/api/customer/project-table/{table_id}"),
        Some(&customer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table_count(&app, project_id).await, 0);
}

#[tokio::test]
async fn test_reads_do_not_change_state() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "reader@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 3, 3).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let created = common::create_project(&app.router, &customer, &plan_id, "Stable").await;
    let project_id = created["id"].as_str().unwrap_or_default();
    common::post_json(
        &app.router,
        "/api/customer/project-table",
        Some(&customer),
        &common::table_body(project_id, "events"),
    )
    .await;

    let uris = [
        format!("/api/customer/projects/{project_id}"),
        "/api/customer/projects".to_string(),
        "/api/customer/project-table".to_string(),
        format!("/api/customer/project-table/all/{project_id}"),
        "/api/customer/package/purchased".to_string(),
    ];
    for uri in &uris {
        let (status, first) = common::get(&app.router, uri, Some(&customer)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let (_, second) = common::get(&app.router, uri, Some(&customer)).await;
        assert_eq!(first["data"], second["data"], "{uri}");
    }
}

#[tokio::test]
async fn test_customer_project_listing_and_updates() {
    let app = common::test_app().await;
    let admin = common::create_admin(&app.db).await;
    let (customer, _) = common::register_customer(&app.router, "lister@example.com").await;
    let (other, _) = common::register_customer(&app.router, "nosy@example.com").await;
    let (_, plan_id) = common::monthly_package(&app.router, &admin, 3, 3).await;
    common::buy(&app.router, &customer, &plan_id).await;
    let alpha = common::create_project(&app.router, &customer, &plan_id, "Alpha").await;
    common::create_project(&app.router, &customer, &plan_id, "Beta").await;
    let alpha_id = alpha["id"].as_str().unwrap_or_default();

    let (_, body) =
        common::get(&app.router, "/api/customer/projects?search=alp", Some(&customer)).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Alpha");

    let (status, body) = common::put_json(
        &app.router,
        &format!("/api/customer/projects/{alpha_id}"),
        Some(&customer),
        &json!({ "description": "Renamed later" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Alpha");
    assert_eq!(body["data"]["description"], "Renamed later");

    let (status, body) = common::patch_json(
        &app.router,
        &format!("/api/customer/projects/{alpha_id}/status"),
        Some(&customer),
        &json!({ "status": "suspended" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "suspended");

    let (_, body) =
        common::get(&app.router, "/api/customer/projects?status=suspended", Some(&customer)).await;
    assert_eq!(body["pagination"]["total"], 1);

    let (status, _) = common::get(
        &app.router,
        &format!("/api/customer/projects/{alpha_id}"),
        Some(&other),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
