//! PostgreSQL store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{
    ApplicantRepository, ChallanRepository, FeeTitleRepository, PaymentRepository,
    RefreshTokenRepository, Settlement, StoreHealth, StoreResult, UserRepository,
};
use crate::models::{
    Applicant, ApprovalDecision, BankTransaction, Challan, ChallanRecord, FeeTitle,
    FeeTitleDraft, NewApplicant, NewBankTransaction, NewChallan, NewRefreshToken, NewUser,
    RefreshToken, User, UserRole,
};

/// sqlx-backed implementation of every repository trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_user(conn: &mut PgConnection, user: &NewUser) -> StoreResult<User> {
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (
            username, password_hash, role, is_approved, bank_name, branch_code,
            contact_person, contact_number, email, approved_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.is_approved)
    .bind(&user.profile.bank_name)
    .bind(&user.profile.branch_code)
    .bind(&user.profile.contact_person)
    .bind(&user.profile.contact_number)
    .bind(&user.profile.email)
    .bind(user.approved_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

async fn load_record(conn: &mut PgConnection, challan: Challan) -> StoreResult<ChallanRecord> {
    let applicant = sqlx::query_as::<_, Applicant>("SELECT * FROM applicants WHERE id = $1")
        .bind(challan.applicant_id)
        .fetch_one(&mut *conn)
        .await?;

    let fee_title = sqlx::query_as::<_, FeeTitle>("SELECT * FROM fee_titles WHERE id = $1")
        .bind(challan.fee_title_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(ChallanRecord {
        challan,
        applicant,
        fee_title,
    })
}

async fn latest_transaction(
    conn: &mut PgConnection,
    challan_no: i64,
) -> StoreResult<Option<BankTransaction>> {
    let row = sqlx::query_as::<_, BankTransaction>(
        r#"
        SELECT * FROM bank_transactions
        WHERE challan_no = $1
        ORDER BY paid_date DESC, transaction_id DESC
        LIMIT 1
        "#,
    )
    .bind(challan_no)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, &user).await
    }

    async fn insert_with_applicant(
        &self,
        user: NewUser,
        applicant: NewApplicant,
    ) -> StoreResult<(User, Applicant)> {
        let mut tx = self.pool.begin().await?;

        let user = insert_user(&mut tx, &user).await?;

        let applicant = sqlx::query_as::<_, Applicant>(
            r#"
            INSERT INTO applicants (full_name, cnic, mobile_no, email, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&applicant.full_name)
        .bind(&applicant.cnic)
        .bind(&applicant.mobile_no)
        .bind(&applicant.email)
        .bind(user.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, applicant))
    }

    async fn list_pending_banks(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role = $1 AND is_approved = FALSE AND rejection_reason IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(UserRole::Bank)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn resolve_approval(
        &self,
        id: i64,
        decision: ApprovalDecision,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let query = match decision {
            ApprovalDecision::Approve => sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET is_approved = TRUE, approved_at = $3, rejection_reason = NULL
                WHERE id = $1 AND role = $2 AND is_approved = FALSE AND rejection_reason IS NULL
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(UserRole::Bank)
            .bind(at),
            ApprovalDecision::Reject(reason) => sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET rejection_reason = $3
                WHERE id = $1 AND role = $2 AND is_approved = FALSE AND rejection_reason IS NULL
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(UserRole::Bank)
            .bind(reason),
        };

        let user = query.fetch_optional(&self.pool).await?;
        Ok(user)
    }
}

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expiry_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expiry_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let row =
            sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token_hash = $1")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn rotate(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        replacement: NewRefreshToken,
    ) -> StoreResult<Option<RefreshToken>> {
        let mut tx = self.pool.begin().await?;

        // The conditional update takes the row lock; a concurrent rotation of
        // the same token re-evaluates the predicate after we commit and misses.
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE token_hash = $1 AND is_revoked = FALSE AND expiry_date >= $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if revoked == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expiry_date, created_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(replacement.expiry_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }

    async fn revoke(&self, token_hash: &str) -> StoreResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE token_hash = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> StoreResult<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE user_id = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}

#[async_trait]
impl FeeTitleRepository for PgStore {
    async fn list_all(&self) -> StoreResult<Vec<FeeTitle>> {
        let rows = sqlx::query_as::<_, FeeTitle>("SELECT * FROM fee_titles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_active(&self, today: NaiveDate) -> StoreResult<Vec<FeeTitle>> {
        let rows = sqlx::query_as::<_, FeeTitle>(
            r#"
            SELECT * FROM fee_titles
            WHERE has_expiry = FALSE OR expiry_date >= $1
            ORDER BY id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> StoreResult<Option<FeeTitle>> {
        let row = sqlx::query_as::<_, FeeTitle>("SELECT * FROM fee_titles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, draft: FeeTitleDraft) -> StoreResult<FeeTitle> {
        let row = sqlx::query_as::<_, FeeTitle>(
            r#"
            INSERT INTO fee_titles (title, amount, fee_kind, has_expiry, expiry_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&draft.title)
        .bind(draft.amount)
        .bind(draft.fee_kind)
        .bind(draft.has_expiry)
        .bind(draft.expiry_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: FeeTitleDraft) -> StoreResult<Option<FeeTitle>> {
        let row = sqlx::query_as::<_, FeeTitle>(
            r#"
            UPDATE fee_titles
            SET title = $2, amount = $3, fee_kind = $4, has_expiry = $5, expiry_date = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&draft.title)
        .bind(draft.amount)
        .bind(draft.fee_kind)
        .bind(draft.has_expiry)
        .bind(draft.expiry_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM fee_titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}

#[async_trait]
impl ApplicantRepository for PgStore {
    async fn find_by_cnic(&self, cnic: &str) -> StoreResult<Option<Applicant>> {
        let row = sqlx::query_as::<_, Applicant>("SELECT * FROM applicants WHERE cnic = $1")
            .bind(cnic)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_or_create(&self, applicant: NewApplicant) -> StoreResult<Applicant> {
        let inserted = sqlx::query_as::<_, Applicant>(
            r#"
            INSERT INTO applicants (full_name, cnic, mobile_no, email, user_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cnic) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&applicant.full_name)
        .bind(&applicant.cnic)
        .bind(&applicant.mobile_no)
        .bind(&applicant.email)
        .bind(applicant.user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }

        let existing = sqlx::query_as::<_, Applicant>("SELECT * FROM applicants WHERE cnic = $1")
            .bind(&applicant.cnic)
            .fetch_one(&self.pool)
            .await?;
        Ok(existing)
    }
}

#[async_trait]
impl ChallanRepository for PgStore {
    async fn insert(&self, challan: NewChallan) -> StoreResult<Challan> {
        let row = sqlx::query_as::<_, Challan>(
            r#"
            INSERT INTO challans (applicant_id, fee_title_id, fee_amount, generated_date, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(challan.applicant_id)
        .bind(challan.fee_title_id)
        .bind(challan.fee_amount)
        .bind(challan.generated_date)
        .bind(&challan.details)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_record(&self, challan_no: i64) -> StoreResult<Option<ChallanRecord>> {
        let mut conn = self.pool.acquire().await?;
        let challan = sqlx::query_as::<_, Challan>("SELECT * FROM challans WHERE challan_no = $1")
            .bind(challan_no)
            .fetch_optional(&mut *conn)
            .await?;

        match challan {
            Some(challan) => Ok(Some(load_record(&mut conn, challan).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<ChallanRecord>> {
        let mut conn = self.pool.acquire().await?;
        let challans = sqlx::query_as::<_, Challan>(
            r#"
            SELECT c.* FROM challans c
            JOIN applicants a ON a.id = c.applicant_id
            WHERE a.user_id = $1
            ORDER BY c.challan_no DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut records = Vec::with_capacity(challans.len());
        for challan in challans {
            records.push(load_record(&mut conn, challan).await?);
        }
        Ok(records)
    }

    async fn mark_expired(&self, challan_no: i64) -> StoreResult<Option<Challan>> {
        let row = sqlx::query_as::<_, Challan>(
            r#"
            UPDATE challans
            SET is_expired = TRUE
            WHERE challan_no = $1 AND is_paid = FALSE
            RETURNING *
            "#,
        )
        .bind(challan_no)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

struct PgSettlement {
    tx: Transaction<'static, Postgres>,
    record: Option<ChallanRecord>,
    last_transaction: Option<BankTransaction>,
}

#[async_trait]
impl Settlement for PgSettlement {
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
        let mut tx = self.tx;

        let row = sqlx::query_as::<_, BankTransaction>(
            r#"
            INSERT INTO bank_transactions (
                challan_no, challan_date, challan_amount, fee_title, paid_date,
                branch_name, branch_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(transaction.challan_no)
        .bind(transaction.challan_date)
        .bind(transaction.challan_amount)
        .bind(&transaction.fee_title)
        .bind(transaction.paid_date)
        .bind(&transaction.branch_name)
        .bind(&transaction.branch_code)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE challans SET is_paid = TRUE WHERE challan_no = $1")
            .bind(transaction.challan_no)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row)
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn begin_settlement(&self, challan_no: i64) -> StoreResult<Box<dyn Settlement>> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback; a second payer blocks here and then
        // reads the committed `is_paid = TRUE`.
        let challan = sqlx::query_as::<_, Challan>(
            "SELECT * FROM challans WHERE challan_no = $1 FOR UPDATE",
        )
        .bind(challan_no)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match challan {
            Some(challan) => Some(load_record(&mut tx, challan).await?),
            None => None,
        };
        let last_transaction = latest_transaction(&mut tx, challan_no).await?;

        Ok(Box::new(PgSettlement {
            tx,
            record,
            last_transaction,
        }))
    }

    async fn latest_for_challan(&self, challan_no: i64) -> StoreResult<Option<BankTransaction>> {
        let mut conn = self.pool.acquire().await?;
        latest_transaction(&mut conn, challan_no).await
    }

    async fn list_for_challan(&self, challan_no: i64) -> StoreResult<Vec<BankTransaction>> {
        let rows = sqlx::query_as::<_, BankTransaction>(
            "SELECT * FROM bank_transactions WHERE challan_no = $1 ORDER BY transaction_id",
        )
        .bind(challan_no)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
