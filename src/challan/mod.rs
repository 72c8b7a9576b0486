//! Challan engine
//!
//! Fee computation, challan generation and the computed-expiry rule shared
//! with the payment path.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::repository::{conflict_message, StoreError};

mod expiry;
mod fee;
mod service;

pub use expiry::{effective_expiry, fee_title_lapsed};
pub use fee::{compute_fee, FeeComputation};
pub use service::ChallanService;

#[derive(Error, Debug)]
pub enum ChallanError {
    #[error("{0}")]
    Validation(String),

    #[error("Fee title {0} does not exist")]
    UnknownFeeTitle(i64),

    #[error("{0}")]
    InvalidRecheckRequest(String),

    #[error("Challan {0} not found")]
    NotFound(i64),

    #[error("You are not authorized to access this challan")]
    Forbidden,

    #[error("Challan {0} has already been paid")]
    AlreadyPaid(i64),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ChallanError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(constraint) => {
                ChallanError::Conflict(conflict_message(&constraint).to_string())
            }
            other => ChallanError::Store(other),
        }
    }
}

/// Business date used for generation, payment and expiry checks
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
