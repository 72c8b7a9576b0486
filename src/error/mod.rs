//! Centralized API error handling for the challan portal
//!
//! Every domain error is converted into [`ApiError`], which renders
//! `{"error": {"code", "message", "details"?}}` with a stable code.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::challan::ChallanError;
use crate::payment::PaymentError;
use crate::repository::{conflict_message, StoreError};

const INTERNAL_MESSAGE: &str = "An internal error occurred. Please try again later.";

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    AlreadyPaid { message: String, details: Value },

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Bank account is pending administrator approval")]
    PendingApproval { reason: Option<String> },

    #[error("{0}")]
    Expired(String),

    #[error("{0}")]
    TokenInvalid(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::AlreadyPaid { .. } => "ALREADY_PAID",
            ApiError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::PendingApproval { .. } => "PENDING_APPROVAL",
            ApiError::Expired(_) => "EXPIRED",
            ApiError::TokenInvalid(_) => "TOKEN_INVALID",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::AlreadyPaid { .. } => StatusCode::CONFLICT,
            ApiError::InvalidCredentials(_) | ApiError::TokenInvalid(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) | ApiError::PendingApproval { .. } => StatusCode::FORBIDDEN,
            ApiError::Expired(_) => StatusCode::GONE,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Structured payload that accompanies the message, if any
    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::AlreadyPaid { details, .. } => Some(details.clone()),
            ApiError::PendingApproval {
                reason: Some(reason),
            } => Some(json!({ "rejectionReason": reason })),
            _ => None,
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(self, ApiError::DatabaseError(_) | ApiError::InternalError(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Storage details stay in the logs
        let message = if self.is_server_error() {
            tracing::error!(error = %self, code = %error_code, "Server error occurred");
            INTERNAL_MESSAGE.to_string()
        } else {
            tracing::debug!(error = %self, code = %error_code, "Client error occurred");
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// Conversions from domain errors

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                ApiError::Conflict(conflict_message(&constraint).to_string())
            }
            StoreError::StillReferenced(_) => {
                ApiError::Conflict("Record is still referenced by other records".to_string())
            }
            StoreError::Database(message) => ApiError::DatabaseError(message),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials(err.to_string()),
            AuthError::PendingApproval { reason } => ApiError::PendingApproval { reason },
            AuthError::TokenNotFound | AuthError::TokenExpiredOrRevoked => {
                ApiError::TokenInvalid(err.to_string())
            }
            AuthError::Token(e) => ApiError::TokenInvalid(e.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::NotABankUser | AuthError::Validation(_) => {
                ApiError::ValidationError(err.to_string())
            }
            AuthError::ApprovalAlreadyResolved | AuthError::Conflict(_) => {
                ApiError::Conflict(err.to_string())
            }
            AuthError::Password(e) => ApiError::InternalError(e.to_string()),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CatalogError::Validation(message) => ApiError::ValidationError(message),
            CatalogError::Conflict(message) => ApiError::Conflict(message),
            CatalogError::Store(e) => e.into(),
        }
    }
}

impl From<ChallanError> for ApiError {
    fn from(err: ChallanError) -> Self {
        match err {
            ChallanError::Validation(message) | ChallanError::InvalidRecheckRequest(message) => {
                ApiError::ValidationError(message)
            }
            ChallanError::UnknownFeeTitle(_) | ChallanError::NotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ChallanError::Forbidden => ApiError::Forbidden(err.to_string()),
            ChallanError::AlreadyPaid(challan_no) => ApiError::AlreadyPaid {
                message: err.to_string(),
                details: json!({ "challanNo": challan_no }),
            },
            ChallanError::Conflict(message) => ApiError::Conflict(message),
            ChallanError::Store(e) => e.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(message) => ApiError::ValidationError(message),
            PaymentError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PaymentError::AlreadyPaid {
                challan_no,
                paid_date,
                ref branch_name,
                ref branch_code,
            } => ApiError::AlreadyPaid {
                details: json!({
                    "challanNo": challan_no,
                    "paidDate": paid_date,
                    "branchName": branch_name,
                    "branchCode": branch_code,
                }),
                message: err.to_string(),
            },
            PaymentError::Expired(_) => ApiError::Expired(err.to_string()),
            PaymentError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::ValidationError(rejection.body_text())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
