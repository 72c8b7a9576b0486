//! Public applicant routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::public;
use crate::state::AppState;

/// Create public applicant routes
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/public/register", post(public::register))
        .route("/public/fee-titles", get(public::list_fee_titles))
        .route(
            "/public/challans",
            get(public::list_challans).post(public::generate_challan),
        )
        .route("/public/challans/:no", get(public::challan_status))
        .route("/public/challans/:no/document", get(public::challan_document))
}
