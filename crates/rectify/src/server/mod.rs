use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{rectification, status};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let rectification_router = Router::new()
        .route("/rectification/login", post(rectification::post_login))
        .route("/rectification/plan", post(rectification::post_plan))
        .route("/rectification/submit", post(rectification::post_submit))
        .route(
            "/rectification/status/:boleta",
            get(rectification::get_status),
        );

    Router::new()
        .route("/health", get(status::get_health))
        .merge(rectification_router)
        .with_state(app_state)
}
