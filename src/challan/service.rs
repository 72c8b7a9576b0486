//! Challan generation and read paths

use std::sync::Arc;

use crate::models::{
    ApplicantSummary, AuthContext, Challan, ChallanDocument, ChallanRecord, ChallanStatus,
    FeeSummary, GenerateChallanRequest, GeneratedChallan, NewApplicant, NewChallan, UserRole,
};
use crate::repository::{
    ApplicantRepository, ChallanRepository, FeeTitleRepository, PaymentRepository, Repositories,
};
use crate::validation::check_identity;

use super::{compute_fee, effective_expiry, today, ChallanError};

#[derive(Clone)]
pub struct ChallanService {
    fee_titles: Arc<dyn FeeTitleRepository>,
    applicants: Arc<dyn ApplicantRepository>,
    challans: Arc<dyn ChallanRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl ChallanService {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            fee_titles: repositories.fee_titles.clone(),
            applicants: repositories.applicants.clone(),
            challans: repositories.challans.clone(),
            payments: repositories.payments.clone(),
        }
    }

    /// Issue a new challan
    ///
    /// Every check, including the fee computation, runs before the first
    /// write. An applicant already registered under the CNIC is reused as-is.
    pub async fn generate(
        &self,
        caller: &AuthContext,
        request: GenerateChallanRequest,
    ) -> Result<GeneratedChallan, ChallanError> {
        let full_name = request.applicant_name.trim();
        if full_name.is_empty() {
            return Err(ChallanError::Validation(
                "Applicant name is required".to_string(),
            ));
        }
        check_identity(&request.cnic, &request.mobile_no)
            .map_err(|(_, message)| ChallanError::Validation(message.to_string()))?;
        let email = match request.email.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(email) if validator::validate_email(email) => Some(email.to_string()),
            Some(_) => {
                return Err(ChallanError::Validation(
                    "Email address is invalid".to_string(),
                ))
            }
        };

        let fee_title = self
            .fee_titles
            .find(request.fee_title_id)
            .await?
            .ok_or(ChallanError::UnknownFeeTitle(request.fee_title_id))?;
        let fee = compute_fee(&fee_title, &request.recheck)?;

        let applicant = self
            .applicants
            .find_or_create(NewApplicant {
                full_name: full_name.to_string(),
                cnic: request.cnic,
                mobile_no: request.mobile_no,
                email,
                user_id: caller.has_role(UserRole::Public).then_some(caller.user_id),
            })
            .await?;

        let challan = self
            .challans
            .insert(NewChallan {
                applicant_id: applicant.id,
                fee_title_id: fee_title.id,
                fee_amount: fee.amount,
                generated_date: today(),
                details: fee.details,
            })
            .await?;

        tracing::info!(
            challan_no = challan.challan_no,
            applicant_id = applicant.id,
            fee_title_id = fee_title.id,
            amount = %challan.fee_amount,
            "Challan generated"
        );

        Ok(GeneratedChallan {
            fee: FeeSummary::new(&challan, &fee_title),
            applicant: ApplicantSummary::from(&applicant),
            challan,
        })
    }

    /// Payment and expiry state of one challan
    pub async fn status(
        &self,
        caller: &AuthContext,
        challan_no: i64,
    ) -> Result<ChallanStatus, ChallanError> {
        let record = self.load(challan_no).await?;
        ensure_can_read(caller, &record)?;
        self.describe(record).await
    }

    /// The caller's own challans, newest first
    pub async fn list_mine(&self, caller: &AuthContext) -> Result<Vec<ChallanStatus>, ChallanError> {
        let records = self.challans.list_for_user(caller.user_id).await?;

        let mut statuses = Vec::with_capacity(records.len());
        for record in records {
            statuses.push(self.describe(record).await?);
        }
        Ok(statuses)
    }

    /// Explicitly expire an unpaid challan; expiring twice is a no-op
    pub async fn expire(&self, challan_no: i64) -> Result<Challan, ChallanError> {
        let record = self.load(challan_no).await?;
        if record.challan.is_paid {
            return Err(ChallanError::AlreadyPaid(challan_no));
        }

        // A payment may have committed between the read and the update
        let challan = self
            .challans
            .mark_expired(challan_no)
            .await?
            .ok_or(ChallanError::AlreadyPaid(challan_no))?;

        tracing::info!(challan_no, "Challan expired by administrator");
        Ok(challan)
    }

    /// Everything a rendered challan document shows
    pub async fn document(
        &self,
        caller: &AuthContext,
        challan_no: i64,
    ) -> Result<ChallanDocument, ChallanError> {
        let record = self.load(challan_no).await?;
        ensure_can_read(caller, &record)?;

        let is_expired = effective_expiry(&record.challan, &record.fee_title, today());
        Ok(ChallanDocument {
            challan: record.challan,
            applicant: record.applicant,
            fee_title: record.fee_title,
            is_expired,
        })
    }

    async fn load(&self, challan_no: i64) -> Result<ChallanRecord, ChallanError> {
        self.challans
            .find_record(challan_no)
            .await?
            .ok_or(ChallanError::NotFound(challan_no))
    }

    async fn describe(&self, record: ChallanRecord) -> Result<ChallanStatus, ChallanError> {
        let latest = self
            .payments
            .latest_for_challan(record.challan.challan_no)
            .await?;

        Ok(ChallanStatus {
            challan_no: record.challan.challan_no,
            is_paid: record.challan.is_paid,
            is_expired: effective_expiry(&record.challan, &record.fee_title, today()),
            paid_date: latest.map(|transaction| transaction.paid_date),
            fee: FeeSummary::new(&record.challan, &record.fee_title),
            details: record.challan.details,
        })
    }
}

/// Public callers only see challans of the applicant linked to their account
fn ensure_can_read(caller: &AuthContext, record: &ChallanRecord) -> Result<(), ChallanError> {
    match caller.role {
        UserRole::Admin | UserRole::Bank => Ok(()),
        UserRole::Public if record.applicant.user_id == Some(caller.user_id) => Ok(()),
        UserRole::Public => Err(ChallanError::Forbidden),
    }
}
