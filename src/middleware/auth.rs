//! Authentication middleware
//!
//! Extractors that verify the Bearer access token and check the caller's
//! role before a handler runs.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{JwtError, TokenIssuer};
use crate::error::ApiError;
use crate::models::{AuthContext, UserRole};

/// Authenticated caller extracted from the access token
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(AuthenticatedUser(caller): AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", caller.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::TokenInvalid(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let issuer = Arc::<TokenIssuer>::from_ref(state);

        let claims = issuer
            .verify_access_token(bearer.token())
            .map_err(|e| match e {
                JwtError::TokenExpired => ApiError::TokenInvalid("Token has expired".to_string()),
                _ => ApiError::TokenInvalid("Invalid token".to_string()),
            })?;

        let context = claims
            .into_context()
            .map_err(|_| ApiError::TokenInvalid("Invalid token".to_string()))?;

        Ok(AuthenticatedUser(context))
    }
}

async fn require_role<S>(
    parts: &mut Parts,
    state: &S,
    role: UserRole,
    message: &str,
) -> Result<AuthContext, ApiError>
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    let AuthenticatedUser(caller) = AuthenticatedUser::from_request_parts(parts, state).await?;

    if !caller.has_role(role) {
        tracing::warn!(
            user_id = caller.user_id,
            role = caller.role.as_str(),
            required = role.as_str(),
            "Role check failed"
        );
        return Err(ApiError::Forbidden(message.to_string()));
    }

    Ok(caller)
}

/// Caller with the Admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Admin, "Admin access required")
            .await
            .map(AdminUser)
    }
}

/// Caller with the Bank role
#[derive(Debug, Clone)]
pub struct BankUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for BankUser
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Bank, "Bank access required")
            .await
            .map(BankUser)
    }
}

/// Caller with the Public role
#[derive(Debug, Clone)]
pub struct PublicUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for PublicUser
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Public, "Applicant access required")
            .await
            .map(PublicUser)
    }
}
