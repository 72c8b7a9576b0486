//! Data models for the challan portal
//!
//! Entities mirror the relational schema in `migrations/`; request and
//! response types live in the submodules.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod catalog;
pub mod challan;

pub use auth::*;
pub use catalog::*;
pub use challan::*;

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Bank,
    Public,
}

impl UserRole {
    /// Claim value written into access tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Bank => "bank",
            UserRole::Public => "public",
        }
    }

    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(UserRole::Admin),
            "bank" => Some(UserRole::Bank),
            "public" => Some(UserRole::Public),
            _ => None,
        }
    }
}

/// Optional profile carried by bank accounts
#[derive(Debug, Default, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BankProfile {
    pub bank_name: Option<String>,
    pub branch_code: Option<String>,
    pub contact_person: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
}

/// User account
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_approved: bool,
    #[sqlx(flatten)]
    pub profile: BankProfile,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl User {
    /// A bank account that an administrator has neither approved nor rejected
    pub fn is_pending_bank(&self) -> bool {
        self.role == UserRole::Bank && !self.is_approved && self.rejection_reason.is_none()
    }
}

/// Insertable user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_approved: bool,
    pub profile: BankProfile,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Outcome an administrator records for a pending bank account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject(String),
}

/// Server-side record of an issued refresh token
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expiry_date: DateTime<Utc>,
    pub created_date: DateTime<Utc>,
    pub is_revoked: bool,
}

impl RefreshToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expiry_date >= now
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: i64,
    pub token_hash: String,
    pub expiry_date: DateTime<Utc>,
}

/// How a fee title turns its base amount into a challan amount
#[derive(Debug, Default, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "fee_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    /// The base amount is charged as-is
    #[default]
    Flat,
    /// The base amount is charged once per declared subject (answer-sheet re-checking)
    PerSubject,
}

/// Fee schedule entry
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeTitle {
    pub id: i64,
    pub title: String,
    pub amount: Decimal,
    pub fee_kind: FeeKind,
    pub has_expiry: bool,
    pub expiry_date: Option<NaiveDate>,
}

impl FeeTitle {
    /// Whether the schedule is still open for new challans on `today`
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        match (self.has_expiry, self.expiry_date) {
            (true, Some(expiry)) => expiry >= today,
            _ => true,
        }
    }
}

/// Validated fee title fields, used for both insert and update
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTitleDraft {
    pub title: String,
    pub amount: Decimal,
    pub fee_kind: FeeKind,
    pub has_expiry: bool,
    pub expiry_date: Option<NaiveDate>,
}

/// Person a challan is issued to
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub id: i64,
    pub full_name: String,
    pub cnic: String,
    pub mobile_no: String,
    pub email: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewApplicant {
    pub full_name: String,
    pub cnic: String,
    pub mobile_no: String,
    pub email: Option<String>,
    pub user_id: Option<i64>,
}

/// Payment voucher
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Challan {
    pub challan_no: i64,
    pub applicant_id: i64,
    pub fee_title_id: i64,
    pub fee_amount: Decimal,
    pub generated_date: NaiveDate,
    pub is_paid: bool,
    pub is_expired: bool,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewChallan {
    pub applicant_id: i64,
    pub fee_title_id: i64,
    pub fee_amount: Decimal,
    pub generated_date: NaiveDate,
    pub details: Option<serde_json::Value>,
}

/// A challan together with the rows it references
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallanRecord {
    pub challan: Challan,
    pub applicant: Applicant,
    pub fee_title: FeeTitle,
}

/// Snapshot written by a bank when a challan is paid
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    pub transaction_id: i64,
    pub challan_no: i64,
    pub challan_date: NaiveDate,
    pub challan_amount: Decimal,
    pub fee_title: Option<String>,
    pub paid_date: NaiveDate,
    pub branch_name: String,
    pub branch_code: String,
}

#[derive(Debug, Clone)]
pub struct NewBankTransaction {
    pub challan_no: i64,
    pub challan_date: NaiveDate,
    pub challan_amount: Decimal,
    pub fee_title: Option<String>,
    pub paid_date: NaiveDate,
    pub branch_name: String,
    pub branch_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fee_title(has_expiry: bool, expiry_date: Option<NaiveDate>) -> FeeTitle {
        FeeTitle {
            id: 1,
            title: "Tuition".to_string(),
            amount: Decimal::new(100_000, 2),
            fee_kind: FeeKind::Flat,
            has_expiry,
            expiry_date,
        }
    }

    #[test]
    fn test_role_claim_round_trip() {
        for role in [UserRole::Admin, UserRole::Bank, UserRole::Public] {
            assert_eq!(UserRole::from_claim(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_claim("Admin"), None);
    }

    #[test]
    fn test_fee_title_active_window() {
        let today = Utc::now().date_naive();
        assert!(fee_title(false, None).is_active_on(today));
        assert!(fee_title(true, Some(today)).is_active_on(today));
        assert!(!fee_title(true, Some(today - Duration::days(1))).is_active_on(today));
    }

    #[test]
    fn test_refresh_token_usability() {
        let now = Utc::now();
        let mut token = RefreshToken {
            id: 1,
            user_id: 1,
            token_hash: "h".to_string(),
            expiry_date: now + Duration::days(7),
            created_date: now,
            is_revoked: false,
        };
        assert!(token.is_usable(now));

        token.is_revoked = true;
        assert!(!token.is_usable(now));

        token.is_revoked = false;
        token.expiry_date = now - Duration::seconds(1);
        assert!(!token.is_usable(now));
    }
}
