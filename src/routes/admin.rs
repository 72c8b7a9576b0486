//! Administrator routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

/// Create administrator routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/banks/pending", get(admin::list_pending_banks))
        .route("/admin/banks/:id/approve", post(admin::approve_bank))
        .route("/admin/banks/:id/reject", post(admin::reject_bank))
        .route("/admin/users", post(admin::create_user))
        .route(
            "/admin/fee-titles",
            get(admin::list_fee_titles).post(admin::create_fee_title),
        )
        .route(
            "/admin/fee-titles/:id",
            get(admin::get_fee_title)
                .put(admin::update_fee_title)
                .delete(admin::delete_fee_title),
        )
        .route("/admin/challans/:no", get(admin::challan_status))
        .route("/admin/challans/:no/document", get(admin::challan_document))
        .route("/admin/challans/:no/expire", post(admin::expire_challan))
        .route(
            "/admin/challans/:no/transactions",
            get(admin::challan_transactions),
        )
}
