//! Fee computation strategies

use rust_decimal::Decimal;
use serde_json::json;

use crate::catalog::max_amount;
use crate::models::{FeeKind, FeeTitle, RecheckingInput};

use super::ChallanError;

/// Amount owed plus the fee-specific payload stored on the challan
#[derive(Debug, Clone, PartialEq)]
pub struct FeeComputation {
    pub amount: Decimal,
    pub details: Option<serde_json::Value>,
}

/// Computes the challan amount for `fee_title` without touching the store
pub fn compute_fee(
    fee_title: &FeeTitle,
    input: &RecheckingInput,
) -> Result<FeeComputation, ChallanError> {
    match fee_title.fee_kind {
        FeeKind::Flat => Ok(FeeComputation {
            amount: fee_title.amount,
            details: None,
        }),
        FeeKind::PerSubject => per_subject(fee_title.amount, input),
    }
}

fn per_subject(base: Decimal, input: &RecheckingInput) -> Result<FeeComputation, ChallanError> {
    let count = match input.number_of_subjects {
        Some(n) if n >= 1 => n,
        _ => {
            return Err(invalid("Number of subjects is required for re-checking"));
        }
    };

    let subjects = input.subject_names.as_deref().unwrap_or_default();
    if subjects.len() as i64 != count {
        return Err(invalid(
            "Subject names are required and must match number of subjects",
        ));
    }
    if subjects.iter().any(|s| s.trim().is_empty()) {
        return Err(invalid("Subject names must not be blank"));
    }

    let category = required(input.category.as_deref(), "Category is required for re-checking")?;
    let roll_no = required(input.roll_no.as_deref(), "Roll number is required for re-checking")?;

    let amount = base
        .checked_mul(Decimal::from(count))
        .filter(|amount| *amount <= max_amount())
        .ok_or_else(|| invalid("Total re-checking fee exceeds the maximum challan amount"))?;

    Ok(FeeComputation {
        amount,
        details: Some(json!({
            "numberOfSubjects": count,
            "subjects": subjects,
            "category": category,
            "rollNo": roll_no,
        })),
    })
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ChallanError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(invalid(message)),
    }
}

fn invalid(message: &str) -> ChallanError {
    ChallanError::InvalidRecheckRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fee_title(kind: FeeKind, amount: Decimal) -> FeeTitle {
        FeeTitle {
            id: 1,
            title: "Re-Checking of Answer Sheet".to_string(),
            amount,
            fee_kind: kind,
            has_expiry: false,
            expiry_date: None,
        }
    }

    fn recheck(n: Option<i64>, subjects: &[&str]) -> RecheckingInput {
        RecheckingInput {
            number_of_subjects: n,
            subject_names: Some(subjects.iter().map(|s| s.to_string()).collect()),
            category: Some("Matric".to_string()),
            roll_no: Some("456123".to_string()),
        }
    }

    #[test]
    fn test_flat_fee_ignores_recheck_fields() {
        let result = compute_fee(
            &fee_title(FeeKind::Flat, dec!(1000)),
            &recheck(Some(3), &["Math"]),
        )
        .unwrap();
        assert_eq!(result.amount, dec!(1000));
        assert_eq!(result.details, None);
    }

    #[test]
    fn test_per_subject_multiplies() {
        let result = compute_fee(
            &fee_title(FeeKind::PerSubject, dec!(200)),
            &recheck(Some(3), &["Math", "Physics", "Urdu"]),
        )
        .unwrap();
        assert_eq!(result.amount, dec!(600));

        let details = result.details.unwrap();
        assert_eq!(details["numberOfSubjects"], 3);
        assert_eq!(details["subjects"][2], "Urdu");
        assert_eq!(details["category"], "Matric");
        assert_eq!(details["rollNo"], "456123");
    }

    #[test]
    fn test_per_subject_keeps_cents() {
        let result = compute_fee(
            &fee_title(FeeKind::PerSubject, dec!(150.25)),
            &recheck(Some(2), &["Math", "Physics"]),
        )
        .unwrap();
        assert_eq!(result.amount, dec!(300.50));
    }

    #[test]
    fn test_subject_count_mismatch() {
        let title = fee_title(FeeKind::PerSubject, dec!(200));
        assert!(matches!(
            compute_fee(&title, &recheck(Some(3), &["Math", "Physics"])),
            Err(ChallanError::InvalidRecheckRequest(_))
        ));
        assert!(matches!(
            compute_fee(&title, &recheck(Some(1), &["Math", "Physics"])),
            Err(ChallanError::InvalidRecheckRequest(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        let title = fee_title(FeeKind::PerSubject, dec!(200));

        assert!(compute_fee(&title, &recheck(None, &[])).is_err());
        assert!(compute_fee(&title, &recheck(Some(0), &[])).is_err());
        assert!(compute_fee(&title, &RecheckingInput::default()).is_err());

        let mut input = recheck(Some(1), &["Math"]);
        input.category = Some("  ".to_string());
        assert!(compute_fee(&title, &input).is_err());

        let mut input = recheck(Some(1), &["Math"]);
        input.roll_no = None;
        assert!(compute_fee(&title, &input).is_err());

        assert!(compute_fee(&title, &recheck(Some(2), &["Math", " "])).is_err());
    }

    #[test]
    fn test_total_over_column_limit() {
        let title = fee_title(FeeKind::PerSubject, dec!(99999999));
        assert!(compute_fee(&title, &recheck(Some(2), &["Math", "Physics"])).is_err());
    }
}
