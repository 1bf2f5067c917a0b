use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::middleware::AdminUser;
use crate::entities::status::Role;
use crate::entities::{project, purchase, user};
use crate::error::AppError;
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;

/// Build the admin user route group: `/admin/users/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_customers))
        .route("/admin/users/{id}", get(get_customer))
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub user: user::Model,
    pub total_purchases: u64,
    pub total_projects: u64,
}

/// `GET /api/admin/users`: customers only, `search` matches name or email.
async fn list_customers(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<user::Model>>, AppError> {
    let mut find = user::Entity::find().filter(user::Column::Role.eq(Role::User.as_str()));
    if let Some(term) = query.search_term() {
        find = find.filter(
            Condition::any()
                .add(user::Column::Name.contains(term))
                .add(user::Column::Email.contains(term)),
        );
    }

    let total = find.clone().count(&state.db).await?;
    let users = find
        .order_by_desc(user::Column::CreatedAt)
        .offset(query.offset())
        .limit(query.limit())
        .all(&state.db)
        .await?;

    Ok(ApiResponse::paginated(
        "Users fetched successfully",
        users,
        query.pagination(total),
    ))
}

/// `GET /api/admin/users/{id}`
async fn get_customer(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<CustomerDetail>, AppError> {
    let user_model = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let total_purchases = purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(id))
        .count(&state.db)
        .await?;
    let total_projects = project::Entity::find()
        .filter(project::Column::UserId.eq(id))
        .count(&state.db)
        .await?;

    Ok(ApiResponse::ok(
        "User fetched successfully",
        CustomerDetail {
            user: user_model,
            total_purchases,
            total_projects,
        },
    ))
}
