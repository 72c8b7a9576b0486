//! Authentication HTTP handlers
//!
//! Login, token rotation and revocation, and self-service bank registration.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use super::{ApiJson, AuthenticatedUser};
use crate::error::ApiError;
use crate::models::{
    LoginRequest, RefreshTokenRequest, RegisterBankRequest, RevokeAllResponse, TokenPair,
    UserResponse,
};
use crate::state::AppState;

/// POST /api/auth/login - Exchange credentials for a token pair
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    req.validate()?;

    let tokens = state.auth_service.login(&req.username, &req.password).await?;
    Ok(Json(tokens))
}

/// POST /api/auth/refresh - Rotate a refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = state.auth_service.refresh(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// POST /api/auth/revoke - Revoke one refresh token
pub async fn revoke_token(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth_service.revoke(&req.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/revoke-all - Revoke every refresh token of the caller
pub async fn revoke_all(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<Json<RevokeAllResponse>, ApiError> {
    let revoked_tokens = state.auth_service.revoke_all(caller.user_id).await?;
    Ok(Json(RevokeAllResponse { revoked_tokens }))
}

/// GET /api/auth/me - Profile of the authenticated caller
pub async fn get_current_user(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.current_user(caller.user_id).await?;
    Ok(Json(user.into()))
}

/// POST /api/auth/register/bank - Register a bank account awaiting approval
pub async fn register_bank(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterBankRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.auth_service.register_bank(req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}
