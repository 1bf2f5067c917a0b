mod admin_packages;
mod admin_projects;
mod admin_purchases;
mod admin_users;
mod auth;
mod customer_packages;
mod customer_projects;
mod customer_tables;
mod dashboard;
mod health;

use axum::Router;

use crate::error::attach_error_details;
use crate::state::AppState;

/// The routed application bound to its state.
///
/// Failure bodies carry a `details` field unless the configuration is production.
pub fn app(state: AppState) -> Router {
    let expose_details = !state.config.is_production();
    let app = router().with_state(state);
    if expose_details {
        app.layer(axum::middleware::map_response(attach_error_details))
    } else {
        app
    }
}

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` lightweight liveness probe
/// - `/api/...` everything else; route modules register paths relative to `/api`
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(health::api_router())
        .merge(auth::router())
        .merge(admin_packages::router())
        .merge(admin_purchases::router())
        .merge(admin_projects::router())
        .merge(admin_users::router())
        .merge(customer_packages::router())
        .merge(customer_projects::router())
        .merge(customer_tables::router())
        .merge(dashboard::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api", api)
}
