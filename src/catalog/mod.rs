//! Fee catalog
//!
//! Administrators maintain the fee titles challans are generated against.
//! Changes only shape challans generated afterwards; an existing challan keeps
//! its frozen `fee_amount`.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::challan::today;
use crate::models::{FeeTitle, FeeTitleDraft, FeeTitleRequest};
use crate::repository::{conflict_message, FeeTitleRepository, Repositories, StoreError};

const MAX_TITLE_LENGTH: usize = 255;

/// Largest amount the `NUMERIC(10, 2)` columns hold
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Fee title {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(constraint) => {
                CatalogError::Conflict(conflict_message(&constraint).to_string())
            }
            StoreError::StillReferenced(_) => CatalogError::Conflict(
                "Fee title is referenced by existing challans".to_string(),
            ),
            other => CatalogError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct FeeCatalog {
    fee_titles: Arc<dyn FeeTitleRepository>,
}

impl FeeCatalog {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            fee_titles: repositories.fee_titles.clone(),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<FeeTitle>, CatalogError> {
        Ok(self.fee_titles.list_all().await?)
    }

    /// Titles open for new challans today
    pub async fn list_active(&self) -> Result<Vec<FeeTitle>, CatalogError> {
        Ok(self.fee_titles.list_active(today()).await?)
    }

    pub async fn get(&self, id: i64) -> Result<FeeTitle, CatalogError> {
        self.fee_titles
            .find(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    pub async fn create(&self, request: FeeTitleRequest) -> Result<FeeTitle, CatalogError> {
        let draft = validate_draft(request, today())?;
        let fee_title = self.fee_titles.insert(draft).await?;
        tracing::info!(fee_title_id = fee_title.id, title = %fee_title.title, "Fee title created");
        Ok(fee_title)
    }

    pub async fn update(&self, id: i64, request: FeeTitleRequest) -> Result<FeeTitle, CatalogError> {
        let draft = validate_draft(request, today())?;
        let fee_title = self
            .fee_titles
            .update(id, draft)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        tracing::info!(fee_title_id = id, "Fee title updated");
        Ok(fee_title)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        if !self.fee_titles.delete(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        tracing::info!(fee_title_id = id, "Fee title deleted");
        Ok(())
    }
}

/// Normalises and checks a create/update payload against `today`
pub fn validate_draft(
    request: FeeTitleRequest,
    today: NaiveDate,
) -> Result<FeeTitleDraft, CatalogError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(CatalogError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CatalogError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }

    if request.amount <= Decimal::ZERO {
        return Err(CatalogError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if request.amount.normalize().scale() > 2 {
        return Err(CatalogError::Validation(
            "Amount can have at most two decimal places".to_string(),
        ));
    }
    if request.amount > max_amount() {
        return Err(CatalogError::Validation(format!(
            "Amount must not exceed {}",
            max_amount()
        )));
    }

    let expiry_date = match (request.has_expiry, request.expiry_date) {
        (true, Some(date)) if date > today => Some(date),
        (true, Some(_)) => {
            return Err(CatalogError::Validation(
                "Expiry date must be in the future".to_string(),
            ))
        }
        (true, None) => {
            return Err(CatalogError::Validation(
                "Expiry date is required when the fee title expires".to_string(),
            ))
        }
        (false, Some(_)) => {
            return Err(CatalogError::Validation(
                "Expiry date must be empty when the fee title does not expire".to_string(),
            ))
        }
        (false, None) => None,
    };

    Ok(FeeTitleDraft {
        title,
        amount: request.amount,
        fee_kind: request.fee_kind,
        has_expiry: request.has_expiry,
        expiry_date,
    })
}
