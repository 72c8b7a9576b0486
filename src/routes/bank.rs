//! Bank teller routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::bank;
use crate::state::AppState;

/// Create bank teller routes
pub fn bank_routes() -> Router<AppState> {
    Router::new()
        .route("/bank/challans/:no", get(bank::verify_challan))
        .route("/bank/challans/:no/document", get(bank::challan_document))
        .route("/bank/challans/:no/pay", post(bank::pay_challan))
}
