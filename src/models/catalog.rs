//! Fee catalog request types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::FeeKind;

/// Create/update payload for a fee title
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeeTitleRequest {
    pub title: String,
    pub amount: Decimal,
    #[serde(default)]
    pub fee_kind: FeeKind,
    #[serde(default)]
    pub has_expiry: bool,
    pub expiry_date: Option<NaiveDate>,
}
