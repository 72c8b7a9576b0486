//! Bank teller HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::{ApiPath, BankUser};
use crate::error::ApiError;
use crate::models::{
    BankProfile, BranchInfo, ChallanDocument, PayChallanRequest, PaymentReceipt, VerifiedChallan,
};
use crate::state::AppState;

/// GET /api/bank/challans/:no - Verify a challan before accepting payment
pub async fn verify_challan(
    State(state): State<AppState>,
    _bank: BankUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<VerifiedChallan>, ApiError> {
    Ok(Json(state.payment_verifier.verify(challan_no).await?))
}

/// GET /api/bank/challans/:no/document - Data for a counter receipt
pub async fn challan_document(
    State(state): State<AppState>,
    BankUser(caller): BankUser,
    ApiPath(challan_no): ApiPath<i64>,
) -> Result<Json<ChallanDocument>, ApiError> {
    Ok(Json(state.challan_service.document(&caller, challan_no).await?))
}

/// POST /api/bank/challans/:no/pay - Post a payment
///
/// Branch fields missing from the body fall back to the teller's bank profile.
pub async fn pay_challan(
    State(state): State<AppState>,
    BankUser(caller): BankUser,
    ApiPath(challan_no): ApiPath<i64>,
    body: Result<Json<PayChallanRequest>, JsonRejection>,
) -> Result<Json<PaymentReceipt>, ApiError> {
    let req = match body {
        Ok(Json(req)) => req,
        // No JSON body at all
        Err(JsonRejection::MissingJsonContentType(_)) => PayChallanRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };

    let needs_profile = blank(&req.branch_name) || blank(&req.branch_code);
    let profile = if needs_profile {
        state.auth_service.current_user(caller.user_id).await?.profile
    } else {
        BankProfile::default()
    };

    let branch = resolve_branch(req, profile)?;
    Ok(Json(state.payment_verifier.pay(challan_no, branch).await?))
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn resolve_branch(req: PayChallanRequest, profile: BankProfile) -> Result<BranchInfo, ApiError> {
    let pick = |given: Option<String>, fallback: Option<String>| {
        given
            .filter(|v| !v.trim().is_empty())
            .or(fallback.filter(|v| !v.trim().is_empty()))
    };

    match (
        pick(req.branch_name, profile.bank_name),
        pick(req.branch_code, profile.branch_code),
    ) {
        (Some(branch_name), Some(branch_code)) => Ok(BranchInfo {
            branch_name,
            branch_code,
        }),
        _ => Err(ApiError::ValidationError(
            "Branch name and branch code are required".to_string(),
        )),
    }
}
