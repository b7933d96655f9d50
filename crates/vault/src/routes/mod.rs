//! HTTP route handlers for Vault.

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

mod auth;
mod capsules;
mod health;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/api/health", get(health::health_check))
        .route("/api/ready", get(health::ready_check))

        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))

        // Capsules
        .route(
            "/api/capsules",
            post(capsules::create_capsule).get(capsules::list_capsules),
        )
        .route(
            "/api/capsules/{id}",
            get(capsules::get_capsule).delete(capsules::delete_capsule),
        )
        .route("/api/capsules/{id}/unlock", post(capsules::unlock_capsule))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )

        // Add shared state
        .with_state(state)
}
