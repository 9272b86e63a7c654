//! API route handlers.

pub mod auth;
pub mod user;

use crate::auth::middleware::AppState;
use axum::{routing::get, routing::post, Router};

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth endpoints
        .route("/api/auth/wallet", post(auth::wallet_login))
        // User endpoints
        .route(
            "/api/user/profile",
            get(user::get_profile).patch(user::update_profile),
        )
        .route("/api/user/wallet", get(user::get_wallet))
}
