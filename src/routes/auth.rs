//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/revoke", post(auth::revoke_token))
        .route("/auth/revoke-all", post(auth::revoke_all))
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/register/bank", post(auth::register_bank))
}
