//! Administrator HTTP handlers
//!
//! Bank approval, account creation, fee catalog maintenance and challan
//! expiry.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::{AdminUser, ApiJson, ApiPath};
use crate::error::ApiError;
use crate::models::{
    BankTransaction, Challan, ChallanDocument, ChallanStatus, FeeTitle, FeeTitleRequest,
    RegisterUserRequest, RejectBankRequest, UserResponse,
};
use crate::state::AppState;

/// GET /api/admin/banks/pending - Bank accounts awaiting a decision
pub async fn list_pending_banks(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.auth_service.list_pending_banks().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/admin/banks/:id/approve
pub async fn approve_bank(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.approve(user_id).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/banks/:id/reject
pub async fn reject_bank(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(req): ApiJson<RejectBankRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    req.validate()?;

    let user = state.auth_service.reject(user_id, &req.reason).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users - Create an Admin or Bank account
pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.auth_service.register_admin_user(req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/admin/fee-titles - Every fee title, including lapsed ones
pub async fn list_fee_titles(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<FeeTitle>>, ApiError> {
    Ok(Json(state.fee_catalog.list_all().await?))
}

/// POST /api/admin/fee-titles
pub async fn create_fee_title(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<FeeTitleRequest>,
) -> Result<(StatusCode, Json<FeeTitle>), ApiError> {
    let fee_title = state.fee_catalog.create(req).await?;
    Ok((StatusCode::CREATED, Json(fee_title)))
}

/// GET /api/admin/fee-titles/:id
pub async fn get_fee_title(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<FeeTitle>, ApiError> {
    Ok(Json(state.fee_catalog.get(id).await?))
}

/// PUT /api/admin/fee-titles/:id
pub async fn update_fee_title(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<FeeTitleRequest>,
) -> Result<Json<FeeTitle>, ApiError> {
    Ok(Json(state.fee_catalog.update(id, req).await?))
}

/// DELETE /api/admin/fee-titles/:id
pub async fn delete_fee_title(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.fee_catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/challans/:no - Status of any challan
pub async fn challan_status(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<ChallanStatus>, ApiError> {
    Ok(Json(state.challan_service.status(&caller, challan_no).await?))
}

/// GET /api/admin/challans/:no/document
pub async fn challan_document(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<ChallanDocument>, ApiError> {
    Ok(Json(state.challan_service.document(&caller, challan_no).await?))
}

/// POST /api/admin/challans/:no/expire
pub async fn expire_challan(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<Challan>, ApiError> {
    Ok(Json(state.challan_service.expire(challan_no).await?))
}

/// GET /api/admin/challans/:no/transactions
pub async fn challan_transactions(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<Vec<BankTransaction>>, ApiError> {
    Ok(Json(state.payment_verifier.transactions(challan_no).await?))
}
