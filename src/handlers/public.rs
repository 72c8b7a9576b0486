//! Public applicant HTTP handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use super::{ApiJson, ApiPath, PublicUser};
use crate::error::ApiError;
use crate::models::{
    ApplicantRegisterRequest, ApplicantRegistration, ChallanDocument, ChallanStatus, FeeTitle,
    GenerateChallanRequest, GeneratedChallan,
};
use crate::state::AppState;

/// POST /api/public/register - Create an applicant account and sign it in
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ApplicantRegisterRequest>,
) -> Result<(StatusCode, Json<ApplicantRegistration>), ApiError> {
    let registration = state.auth_service.register_public(req).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// GET /api/public/fee-titles - Fee titles open for new challans
pub async fn list_fee_titles(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeeTitle>>, ApiError> {
    Ok(Json(state.fee_catalog.list_active().await?))
}

/// POST /api/public/challans - Generate a challan
pub async fn generate_challan(
    State(state): State<AppState>,
    PublicUser(caller): PublicUser,
    ApiJson(req): ApiJson<GenerateChallanRequest>,
) -> Result<(StatusCode, Json<GeneratedChallan>), ApiError> {
    let generated = state.challan_service.generate(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

/// GET /api/public/challans - The caller's challans
pub async fn list_challans(
    State(state): State<AppState>,
    PublicUser(caller): PublicUser,
) -> Result<Json<Vec<ChallanStatus>>, ApiError> {
    Ok(Json(state.challan_service.list_mine(&caller).await?))
}

/// GET /api/public/challans/:no - Status of one of the caller's challans
pub async fn challan_status(
    State(state): State<AppState>,
    PublicUser(caller): PublicUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<ChallanStatus>, ApiError> {
    Ok(Json(state.challan_service.status(&caller, challan_no).await?))
}

/// GET /api/public/challans/:no/document - Data for the printable challan
pub async fn challan_document(
    State(state): State<AppState>,
    PublicUser(caller): PublicUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<ChallanDocument>, ApiError> {
    Ok(Json(state.challan_service.document(&caller, challan_no).await?))
}
