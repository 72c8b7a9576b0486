//! Persistence ports
//!
//! One trait per entity, exposing only the operations the services use.
//! Operations that must be atomic are named units of work
//! ([`RefreshTokenRepository::rotate`], [`PaymentRepository::begin_settlement`])
//! so every implementation carries the same guarantees.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{
    Applicant, ApprovalDecision, BankTransaction, Challan, ChallanRecord, FeeTitle,
    FeeTitleDraft, NewApplicant, NewBankTransaction, NewChallan, NewRefreshToken, NewUser,
    RefreshToken, User,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Row is still referenced: {0}")]
    StillReferenced(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some("23505") => return StoreError::Conflict(constraint),
                Some("23503") => return StoreError::StillReferenced(constraint),
                _ => {}
            }
        }
        StoreError::Database(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Client-facing wording for a violated unique constraint
pub fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "users_username_key" => "Username already exists",
        "applicants_cnic_key" => "An applicant with this CNIC is already registered",
        "fee_titles_title_key" => "A fee title with this name already exists",
        _ => "Record already exists",
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::Conflict`] on a duplicate username
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    /// Creates a user and its applicant profile together
    async fn insert_with_applicant(
        &self,
        user: NewUser,
        applicant: NewApplicant,
    ) -> StoreResult<(User, Applicant)>;

    /// Bank users neither approved nor rejected, oldest first
    async fn list_pending_banks(&self) -> StoreResult<Vec<User>>;

    /// Applies the decision only while the user is still a pending bank account
    async fn resolve_approval(
        &self,
        id: i64,
        decision: ApprovalDecision,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// Revokes `token_hash` and stores `replacement` in one unit of work.
    ///
    /// Returns `None` without writing anything when the old token is no longer
    /// usable at `now` (revoked, expired or unknown), so only one of two
    /// concurrent rotations of the same token succeeds.
    async fn rotate(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        replacement: NewRefreshToken,
    ) -> StoreResult<Option<RefreshToken>>;

    /// Returns whether a live token was revoked
    async fn revoke(&self, token_hash: &str) -> StoreResult<bool>;

    async fn revoke_all_for_user(&self, user_id: i64) -> StoreResult<u64>;
}

#[async_trait]
pub trait FeeTitleRepository: Send + Sync {
    async fn list_all(&self) -> StoreResult<Vec<FeeTitle>>;

    /// Titles without expiry or expiring on/after `today`
    async fn list_active(&self, today: NaiveDate) -> StoreResult<Vec<FeeTitle>>;

    async fn find(&self, id: i64) -> StoreResult<Option<FeeTitle>>;

    async fn insert(&self, draft: FeeTitleDraft) -> StoreResult<FeeTitle>;

    async fn update(&self, id: i64, draft: FeeTitleDraft) -> StoreResult<Option<FeeTitle>>;

    /// Fails with [`StoreError::StillReferenced`] while challans point at the title
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait ApplicantRepository: Send + Sync {
    async fn find_by_cnic(&self, cnic: &str) -> StoreResult<Option<Applicant>>;

    /// Returns the applicant already registered under the CNIC, or inserts
    /// `applicant`. An existing row is never modified.
    async fn find_or_create(&self, applicant: NewApplicant) -> StoreResult<Applicant>;
}

#[async_trait]
pub trait ChallanRepository: Send + Sync {
    async fn insert(&self, challan: NewChallan) -> StoreResult<Challan>;

    async fn find_record(&self, challan_no: i64) -> StoreResult<Option<ChallanRecord>>;

    /// Challans whose applicant is linked to `user_id`, newest first
    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<ChallanRecord>>;

    /// Sets `is_expired` only while the challan is unpaid
    async fn mark_expired(&self, challan_no: i64) -> StoreResult<Option<Challan>>;
}

/// Row-locked view of one challan during payment
///
/// Dropping a settlement without committing releases the lock and discards
/// nothing but the read.
#[async_trait]
pub trait Settlement: Send {
    fn record(&self) -> Option<&ChallanRecord>;

    fn last_transaction(&self) -> Option<&BankTransaction>;

    /// Inserts the transaction and sets `is_paid` in the same commit
    async fn commit_payment(
        self: Box<Self>,
        transaction: NewBankTransaction,
    ) -> StoreResult<BankTransaction>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Opens a unit of work holding the challan row lock until commit or drop
    async fn begin_settlement(&self, challan_no: i64) -> StoreResult<Box<dyn Settlement>>;

    async fn latest_for_challan(&self, challan_no: i64) -> StoreResult<Option<BankTransaction>>;

    async fn list_for_challan(&self, challan_no: i64) -> StoreResult<Vec<BankTransaction>>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;
}

/// Every repository the services need, sharing one backing store
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub fee_titles: Arc<dyn FeeTitleRepository>,
    pub applicants: Arc<dyn ApplicantRepository>,
    pub challans: Arc<dyn ChallanRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + RefreshTokenRepository
            + FeeTitleRepository
            + ApplicantRepository
            + ChallanRepository
            + PaymentRepository
            + StoreHealth
            + 'static,
    {
        Self {
            users: store.clone(),
            refresh_tokens: store.clone(),
            fee_titles: store.clone(),
            applicants: store.clone(),
            challans: store.clone(),
            payments: store.clone(),
            health: store,
        }
    }
}
