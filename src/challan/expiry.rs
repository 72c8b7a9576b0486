//! Computed challan expiry
//!
//! Expiry is read from the *current* fee title, so moving a title's expiry
//! date into the past also expires unpaid challans generated earlier.

use chrono::NaiveDate;

use crate::models::{Challan, FeeTitle};

/// Whether the fee title's own validity window has closed before `today`
pub fn fee_title_lapsed(fee_title: &FeeTitle, today: NaiveDate) -> bool {
    fee_title.has_expiry && fee_title.expiry_date.is_some_and(|expiry| expiry < today)
}

/// Explicit admin expiry, or a lapsed fee title
pub fn effective_expiry(challan: &Challan, fee_title: &FeeTitle, today: NaiveDate) -> bool {
    challan.is_expired || fee_title_lapsed(fee_title, today)
}
