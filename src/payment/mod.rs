//! Payment verifier
//!
//! The bank-facing path: verify a challan, then post its payment. Posting
//! re-runs every verification check under the challan's row lock, so a stale
//! verification can never lead to a double payment.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::challan::{effective_expiry, today};
use crate::models::{
    ApplicantSummary, BankTransaction, BranchInfo, ChallanRecord, FeeSummary, NewBankTransaction,
    PaymentReceipt, VerifiedChallan,
};
use crate::repository::{ChallanRepository, PaymentRepository, Repositories, StoreError};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("Challan {0} not found")]
    NotFound(i64),

    #[error("Challan {challan_no} has already been paid")]
    AlreadyPaid {
        challan_no: i64,
        paid_date: Option<NaiveDate>,
        branch_name: Option<String>,
        branch_code: Option<String>,
    },

    #[error("Challan {0} has expired")]
    Expired(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct PaymentVerifier {
    challans: Arc<dyn ChallanRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl PaymentVerifier {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            challans: repositories.challans.clone(),
            payments: repositories.payments.clone(),
        }
    }

    /// Confirm a challan can be paid and return what the teller needs to see
    pub async fn verify(&self, challan_no: i64) -> Result<VerifiedChallan, PaymentError> {
        let record = self.challans.find_record(challan_no).await?;
        let last_transaction = match &record {
            Some(r) if r.challan.is_paid => self.payments.latest_for_challan(challan_no).await?,
            _ => None,
        };

        let record = check_payable(
            challan_no,
            record.as_ref(),
            last_transaction.as_ref(),
            today(),
        )?;

        Ok(VerifiedChallan {
            challan_no,
            applicant: ApplicantSummary::from(&record.applicant),
            fee: FeeSummary::new(&record.challan, &record.fee_title),
            details: record.challan.details.clone(),
        })
    }

    /// Post a payment: one transaction row and `is_paid`, committed together
    pub async fn pay(
        &self,
        challan_no: i64,
        branch: BranchInfo,
    ) -> Result<PaymentReceipt, PaymentError> {
        let branch_name = branch.branch_name.trim();
        let branch_code = branch.branch_code.trim();
        if branch_name.is_empty() || branch_code.is_empty() {
            return Err(PaymentError::Validation(
                "Branch name and branch code are required".to_string(),
            ));
        }

        let settlement = self.payments.begin_settlement(challan_no).await?;
        let paid_date = today();

        let transaction = {
            let record = check_payable(
                challan_no,
                settlement.record(),
                settlement.last_transaction(),
                paid_date,
            )?;

            NewBankTransaction {
                challan_no,
                challan_date: record.challan.generated_date,
                challan_amount: record.challan.fee_amount,
                fee_title: Some(record.fee_title.title.clone()),
                paid_date,
                branch_name: branch_name.to_string(),
                branch_code: branch_code.to_string(),
            }
        };

        let transaction = settlement.commit_payment(transaction).await?;

        tracing::info!(
            challan_no,
            transaction_id = transaction.transaction_id,
            amount = %transaction.challan_amount,
            branch_code = %transaction.branch_code,
            "Challan paid"
        );

        Ok(PaymentReceipt {
            challan_no,
            transaction,
        })
    }

    /// Transactions recorded against a challan, oldest first
    pub async fn transactions(&self, challan_no: i64) -> Result<Vec<BankTransaction>, PaymentError> {
        if self.challans.find_record(challan_no).await?.is_none() {
            return Err(PaymentError::NotFound(challan_no));
        }
        Ok(self.payments.list_for_challan(challan_no).await?)
    }
}

/// NotFound, then AlreadyPaid, then Expired
fn check_payable<'a>(
    challan_no: i64,
    record: Option<&'a ChallanRecord>,
    last_transaction: Option<&BankTransaction>,
    today: NaiveDate,
) -> Result<&'a ChallanRecord, PaymentError> {
    let Some(record) = record else {
        tracing::warn!(challan_no, "Payment check failed: challan not found");
        return Err(PaymentError::NotFound(challan_no));
    };

    if record.challan.is_paid {
        tracing::warn!(challan_no, "Payment check failed: already paid");
        return Err(PaymentError::AlreadyPaid {
            challan_no,
            paid_date: last_transaction.map(|t| t.paid_date),
            branch_name: last_transaction.map(|t| t.branch_name.clone()),
            branch_code: last_transaction.map(|t| t.branch_code.clone()),
        });
    }

    if effective_expiry(&record.challan, &record.fee_title, today) {
        tracing::warn!(challan_no, "Payment check failed: challan expired");
        return Err(PaymentError::Expired(challan_no));
    }

    Ok(record)
}
