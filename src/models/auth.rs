//! Authentication models for the challan portal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{BankProfile, User, UserRole};

/// Caller identity derived from a verified access token
///
/// The HTTP boundary builds this value and checks role capabilities before a
/// core operation runs; the core never reads ambient request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Access + refresh token pair handed to a client
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Self-service registration of a bank account (pending until approved)
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBankRequest {
    #[validate(length(min = 3, max = 100))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub bank_name: String,
    #[validate(length(min = 1, max = 50))]
    pub branch_code: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(length(max = 20))]
    pub contact_number: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl RegisterBankRequest {
    pub fn profile(&self) -> BankProfile {
        BankProfile {
            bank_name: Some(self.bank_name.clone()),
            branch_code: Some(self.branch_code.clone()),
            contact_person: self.contact_person.clone(),
            contact_number: self.contact_number.clone(),
            email: self.email.clone(),
        }
    }
}

/// Administrator-created account (Admin or Bank)
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(length(min = 3, max = 100))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: UserRole,
    #[serde(flatten)]
    pub profile: BankProfile,
}

/// Public applicant self-registration
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRegisterRequest {
    #[validate(length(min = 3, max = 100))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    pub cnic: String,
    pub mobile_no: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRegistration {
    pub tokens: TokenPair,
    pub username: String,
    pub full_name: String,
    pub cnic: String,
    pub mobile_no: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectBankRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub is_approved: bool,
    #[serde(flatten)]
    pub profile: BankProfile,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            is_approved: user.is_approved,
            profile: user.profile,
            created_at: user.created_at,
            approved_at: user.approved_at,
            rejection_reason: user.rejection_reason,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeAllResponse {
    pub revoked_tokens: u64,
}
