//! In-memory store
//!
//! A single mutex guards every table, so each trait method (and each open
//! [`Settlement`]) is serialized against all others. That gives the same
//! atomicity the Postgres units of work provide, which is what the
//! service-level tests rely on.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    ApplicantRepository, ChallanRepository, FeeTitleRepository, PaymentRepository,
    RefreshTokenRepository, Settlement, StoreError, StoreHealth, StoreResult, UserRepository,
};
use crate::models::{
    Applicant, ApprovalDecision, BankTransaction, Challan, ChallanRecord, FeeTitle,
    FeeTitleDraft, NewApplicant, NewBankTransaction, NewChallan, NewRefreshToken, NewUser,
    RefreshToken, User,
};

/// Rows keyed by a generated id
struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
struct MemoryState {
    users: Table<User>,
    refresh_tokens: Table<RefreshToken>,
    fee_titles: Table<FeeTitle>,
    applicants: Table<Applicant>,
    challans: Table<Challan>,
    transactions: Table<BankTransaction>,
}

impl MemoryState {
    fn insert_user(&mut self, user: NewUser) -> StoreResult<User> {
        if self
            .users
            .rows
            .values()
            .any(|existing| existing.username == user.username)
        {
            return Err(StoreError::Conflict("users_username_key".to_string()));
        }

        let id = self.users.next_id();
        let row = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            is_approved: user.is_approved,
            profile: user.profile,
            created_at: Utc::now(),
            approved_at: user.approved_at,
            rejection_reason: None,
        };
        self.users.rows.insert(id, row.clone());
        Ok(row)
    }

    fn insert_applicant(&mut self, applicant: NewApplicant) -> StoreResult<Applicant> {
        if self.find_applicant_by_cnic(&applicant.cnic).is_some() {
            return Err(StoreError::Conflict("applicants_cnic_key".to_string()));
        }

        let id = self.applicants.next_id();
        let row = Applicant {
            id,
            full_name: applicant.full_name,
            cnic: applicant.cnic,
            mobile_no: applicant.mobile_no,
            email: applicant.email,
            user_id: applicant.user_id,
        };
        self.applicants.rows.insert(id, row.clone());
        Ok(row)
    }

    fn find_applicant_by_cnic(&self, cnic: &str) -> Option<&Applicant> {
        self.applicants.rows.values().find(|a| a.cnic == cnic)
    }

    fn ensure_unique_title(&self, title: &str, except: Option<i64>) -> StoreResult<()> {
        let clash = self
            .fee_titles
            .rows
            .values()
            .any(|f| f.title == title && Some(f.id) != except);
        if clash {
            return Err(StoreError::Conflict("fee_titles_title_key".to_string()));
        }
        Ok(())
    }

    fn record(&self, challan_no: i64) -> Option<ChallanRecord> {
        let challan = self.challans.rows.get(&challan_no)?;
        let applicant = self.applicants.rows.get(&challan.applicant_id)?;
        let fee_title = self.fee_titles.rows.get(&challan.fee_title_id)?;
        Some(ChallanRecord {
            challan: challan.clone(),
            applicant: applicant.clone(),
            fee_title: fee_title.clone(),
        })
    }

    fn latest_transaction(&self, challan_no: i64) -> Option<BankTransaction> {
        self.transactions
            .rows
            .values()
            .filter(|t| t.challan_no == challan_no)
            .max_by_key(|t| (t.paid_date, t.transaction_id))
            .cloned()
    }
}

/// Process-local implementation of every repository trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.rows.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        state.insert_user(user)
    }

    async fn insert_with_applicant(
        &self,
        user: NewUser,
        mut applicant: NewApplicant,
    ) -> StoreResult<(User, Applicant)> {
        let mut state = self.state.lock().await;
        // Check both constraints before writing either row
        if state.find_applicant_by_cnic(&applicant.cnic).is_some() {
            return Err(StoreError::Conflict("applicants_cnic_key".to_string()));
        }
        let user = state.insert_user(user)?;
        applicant.user_id = Some(user.id);
        let applicant = state.insert_applicant(applicant)?;
        Ok((user, applicant))
    }

    async fn list_pending_banks(&self) -> StoreResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut pending: Vec<User> = state
            .users
            .rows
            .values()
            .filter(|u| u.is_pending_bank())
            .cloned()
            .collect();
        pending.sort_by_key(|u| (u.created_at, u.id));
        Ok(pending)
    }

    async fn resolve_approval(
        &self,
        id: i64,
        decision: ApprovalDecision,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.rows.get_mut(&id) else {
            return Ok(None);
        };
        if !user.is_pending_bank() {
            return Ok(None);
        }

        match decision {
            ApprovalDecision::Approve => {
                user.is_approved = true;
                user.approved_at = Some(at);
                user.rejection_reason = None;
            }
            ApprovalDecision::Reject(reason) => {
                user.rejection_reason = Some(reason);
            }
        }
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut state = self.state.lock().await;
        let id = state.refresh_tokens.next_id();
        let row = RefreshToken {
            id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            expiry_date: token.expiry_date,
            created_date: Utc::now(),
            is_revoked: false,
        };
        state.refresh_tokens.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let state = self.state.lock().await;
        Ok(state
            .refresh_tokens
            .rows
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn rotate(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        replacement: NewRefreshToken,
    ) -> StoreResult<Option<RefreshToken>> {
        let mut state = self.state.lock().await;
        let Some(old) = state
            .refresh_tokens
            .rows
            .values_mut()
            .find(|t| t.token_hash == token_hash)
        else {
            return Ok(None);
        };
        if !old.is_usable(now) {
            return Ok(None);
        }
        old.is_revoked = true;

        let id = state.refresh_tokens.next_id();
        let row = RefreshToken {
            id,
            user_id: replacement.user_id,
            token_hash: replacement.token_hash,
            expiry_date: replacement.expiry_date,
            created_date: now,
            is_revoked: false,
        };
        state.refresh_tokens.rows.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn revoke(&self, token_hash: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        let revoked = state
            .refresh_tokens
            .rows
            .values_mut()
            .find(|t| t.token_hash == token_hash && !t.is_revoked)
            .map(|t| t.is_revoked = true)
            .is_some();
        Ok(revoked)
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let mut count = 0;
        for token in state
            .refresh_tokens
            .rows
            .values_mut()
            .filter(|t| t.user_id == user_id && !t.is_revoked)
        {
            token.is_revoked = true;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl FeeTitleRepository for MemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<FeeTitle>> {
        let state = self.state.lock().await;
        Ok(state.fee_titles.rows.values().cloned().collect())
    }

    async fn list_active(&self, today: NaiveDate) -> StoreResult<Vec<FeeTitle>> {
        let state = self.state.lock().await;
        Ok(state
            .fee_titles
            .rows
            .values()
            .filter(|f| f.is_active_on(today))
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> StoreResult<Option<FeeTitle>> {
        let state = self.state.lock().await;
        Ok(state.fee_titles.rows.get(&id).cloned())
    }

    async fn insert(&self, draft: FeeTitleDraft) -> StoreResult<FeeTitle> {
        let mut state = self.state.lock().await;
        state.ensure_unique_title(&draft.title, None)?;

        let id = state.fee_titles.next_id();
        let row = FeeTitle {
            id,
            title: draft.title,
            amount: draft.amount,
            fee_kind: draft.fee_kind,
            has_expiry: draft.has_expiry,
            expiry_date: draft.expiry_date,
        };
        state.fee_titles.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, draft: FeeTitleDraft) -> StoreResult<Option<FeeTitle>> {
        let mut state = self.state.lock().await;
        state.ensure_unique_title(&draft.title, Some(id))?;

        let Some(row) = state.fee_titles.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.title = draft.title;
        row.amount = draft.amount;
        row.fee_kind = draft.fee_kind;
        row.has_expiry = draft.has_expiry;
        row.expiry_date = draft.expiry_date;
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state.challans.rows.values().any(|c| c.fee_title_id == id) {
            return Err(StoreError::StillReferenced(
                "challans_fee_title_id_fkey".to_string(),
            ));
        }
        Ok(state.fee_titles.rows.remove(&id).is_some())
    }
}

#[async_trait]
impl ApplicantRepository for MemoryStore {
    async fn find_by_cnic(&self, cnic: &str) -> StoreResult<Option<Applicant>> {
        let state = self.state.lock().await;
        Ok(state.find_applicant_by_cnic(cnic).cloned())
    }

    async fn find_or_create(&self, applicant: NewApplicant) -> StoreResult<Applicant> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.find_applicant_by_cnic(&applicant.cnic) {
            return Ok(existing.clone());
        }
        state.insert_applicant(applicant)
    }
}

#[async_trait]
impl ChallanRepository for MemoryStore {
    async fn insert(&self, challan: NewChallan) -> StoreResult<Challan> {
        let mut state = self.state.lock().await;
        if !state.applicants.rows.contains_key(&challan.applicant_id)
            || !state.fee_titles.rows.contains_key(&challan.fee_title_id)
        {
            return Err(StoreError::Database(
                "challan references a missing applicant or fee title".to_string(),
            ));
        }

        let challan_no = state.challans.next_id();
        let row = Challan {
            challan_no,
            applicant_id: challan.applicant_id,
            fee_title_id: challan.fee_title_id,
            fee_amount: challan.fee_amount,
            generated_date: challan.generated_date,
            is_paid: false,
            is_expired: false,
            details: challan.details,
        };
        state.challans.rows.insert(challan_no, row.clone());
        Ok(row)
    }

    async fn find_record(&self, challan_no: i64) -> StoreResult<Option<ChallanRecord>> {
        let state = self.state.lock().await;
        Ok(state.record(challan_no))
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<ChallanRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .challans
            .rows
            .keys()
            .rev()
            .filter_map(|no| state.record(*no))
            .filter(|r| r.applicant.user_id == Some(user_id))
            .collect())
    }

    async fn mark_expired(&self, challan_no: i64) -> StoreResult<Option<Challan>> {
        let mut state = self.state.lock().await;
        match state.challans.rows.get_mut(&challan_no) {
            Some(challan) if !challan.is_paid => {
                challan.is_expired = true;
                Ok(Some(challan.clone()))
            }
            _ => Ok(None),
        }
    }
}

struct MemorySettlement {
    state: OwnedMutexGuard<MemoryState>,
    record: Option<ChallanRecord>,
    last_transaction: Option<BankTransaction>,
}

#[async_trait]
impl Settlement for MemorySettlement {
    fn record(&self) -> Option<&ChallanRecord> {
        self.record.as_ref()
    }

    fn last_transaction(&self) -> Option<&BankTransaction> {
        self.last_transaction.as_ref()
    }

    async fn commit_payment(
        self: Box<Self>,
        transaction: NewBankTransaction,
    ) -> StoreResult<BankTransaction> {
        let mut state = self.state;
        let Some(challan) = state.challans.rows.get_mut(&transaction.challan_no) else {
            return Err(StoreError::Database(format!(
                "challan {} vanished during settlement",
                transaction.challan_no
            )));
        };
        challan.is_paid = true;

        let transaction_id = state.transactions.next_id();
        let row = BankTransaction {
            transaction_id,
            challan_no: transaction.challan_no,
            challan_date: transaction.challan_date,
            challan_amount: transaction.challan_amount,
            fee_title: transaction.fee_title,
            paid_date: transaction.paid_date,
            branch_name: transaction.branch_name,
            branch_code: transaction.branch_code,
        };
        state.transactions.rows.insert(transaction_id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn begin_settlement(&self, challan_no: i64) -> StoreResult<Box<dyn Settlement>> {
        let state = self.state.clone().lock_owned().await;
        let record = state.record(challan_no);
        let last_transaction = state.latest_transaction(challan_no);
        Ok(Box::new(MemorySettlement {
            state,
            record,
            last_transaction,
        }))
    }

    async fn latest_for_challan(&self, challan_no: i64) -> StoreResult<Option<BankTransaction>> {
        let state = self.state.lock().await;
        Ok(state.latest_transaction(challan_no))
    }

    async fn list_for_challan(&self, challan_no: i64) -> StoreResult<Vec<BankTransaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .rows
            .values()
            .filter(|t| t.challan_no == challan_no)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
