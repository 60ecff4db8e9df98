//! HTTP API layer for the service catalog

pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{delete, get};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use state::{ApiInfo, AppState};

/// Builds the catalog router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::get_info))
        .route("/services", get(handlers::list_services).post(handlers::create_service))
        .route(
            "/services/:id",
            get(handlers::get_service).put(handlers::update_service).delete(handlers::delete_service),
        )
        .route(
            "/services/:id/dependencies",
            get(handlers::list_dependencies).post(handlers::add_dependency),
        )
        .route("/services/:id/dependencies/:dependency", delete(handlers::remove_dependency))
        .route("/services/:id/dependents", get(handlers::list_dependents))
        .route("/services/:id/impact", get(handlers::get_impact))
        .route("/services/:id/health", get(handlers::get_health).put(handlers::report_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
