//! Route definitions for the challan portal API

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

mod admin;
mod auth;
mod bank;
mod public;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use bank::bank_routes;
pub use public::public_routes;

/// Every route, with security headers and request tracing applied; CORS is
/// layered on by the binary
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_routes())
        .merge(public_routes())
        .merge(admin_routes())
        .merge(bank_routes());

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        // Tokens and challan data must not be cached by intermediaries
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(security_headers)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .with_state(state)
}
