//! Challan and payment request/response types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Applicant, BankTransaction, Challan, FeeTitle};

/// Extra fields required by per-subject (re-checking) fee titles
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecheckingInput {
    pub number_of_subjects: Option<i64>,
    pub subject_names: Option<Vec<String>>,
    pub category: Option<String>,
    pub roll_no: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChallanRequest {
    pub applicant_name: String,
    pub cnic: String,
    pub mobile_no: String,
    pub email: Option<String>,
    pub fee_title_id: i64,
    #[serde(flatten)]
    pub recheck: RecheckingInput,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantSummary {
    pub name: String,
    pub cnic: String,
    pub mobile_no: String,
}

impl From<&Applicant> for ApplicantSummary {
    fn from(applicant: &Applicant) -> Self {
        Self {
            name: applicant.full_name.clone(),
            cnic: applicant.cnic.clone(),
            mobile_no: applicant.mobile_no.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeSummary {
    pub title: String,
    pub base_amount: Decimal,
    pub total_amount: Decimal,
    pub generated_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
}

impl FeeSummary {
    pub fn new(challan: &Challan, fee_title: &FeeTitle) -> Self {
        Self {
            title: fee_title.title.clone(),
            base_amount: fee_title.amount,
            total_amount: challan.fee_amount,
            generated_date: challan.generated_date,
            expiry_date: if fee_title.has_expiry {
                fee_title.expiry_date
            } else {
                None
            },
        }
    }
}

/// Response to a successful challan generation
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedChallan {
    pub challan: Challan,
    pub applicant: ApplicantSummary,
    pub fee: FeeSummary,
}

/// Read view of a challan's lifecycle state
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChallanStatus {
    pub challan_no: i64,
    pub is_paid: bool,
    /// Explicit expiry or a lapsed fee title
    pub is_expired: bool,
    pub paid_date: Option<NaiveDate>,
    pub fee: FeeSummary,
    pub details: Option<serde_json::Value>,
}

/// Challan as presented to a bank teller after verification
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedChallan {
    pub challan_no: i64,
    pub applicant: ApplicantSummary,
    pub fee: FeeSummary,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PayChallanRequest {
    pub branch_name: Option<String>,
    pub branch_code: Option<String>,
}

/// Branch a payment is posted from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub branch_name: String,
    pub branch_code: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub challan_no: i64,
    pub transaction: BankTransaction,
}

/// Read-only view handed to document rendering
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChallanDocument {
    pub challan: Challan,
    pub applicant: Applicant,
    pub fee_title: FeeTitle,
    pub is_expired: bool,
}
